/// Plays a two-part score into a polyphonic synth with no audio device.
///
/// The host owns the context and the synth and hands itself to every phrase
/// callback, so callbacks schedule notes directly against the audio clock.
use std::sync::{Arc, Mutex};

use saavy_sound::{
    sequencing::{Duration, Part, Phrase, Score},
    synth::{PolySynth, Voice},
    voices, AudioContext, Result, TimeBase,
};

struct Host<V: Voice> {
    ctx: AudioContext,
    synth: PolySynth<V>,
}

impl<V: Voice> TimeBase for Host<V> {
    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn part<V>(name: &'static str, notes: Vec<f32>, log: Log) -> Result<Part<Host<V>>>
where
    V: Voice + 'static,
{
    let mut part = Part::new(0, Duration::EIGHTH)?;
    part.add_phrase(Phrase::new(
        name,
        move |host: &mut Host<V>, offset, note| {
            let at = host.current_time() + offset;
            let Host { ctx, synth } = host;
            if synth.play(ctx, note as u8, 0.6, offset, Some(0.2)).is_ok() {
                if let Ok(mut log) = log.lock() {
                    log.push(format!("{:>6.3}s  {:<6} note {}", at, name, note));
                }
            }
        },
        notes,
    ));
    Ok(part)
}

fn main() -> Result<()> {
    println!("=== Pattern Player ===\n");

    let mut ctx = AudioContext::default();
    let synth = PolySynth::new(&mut ctx, 4, voices::pluck)?;
    let mut host = Host { ctx, synth };
    let log: Log = Arc::default();

    let mut score = Score::new(vec![
        part("verse", vec![60.0, 0.0, 64.0, 67.0, 0.0, 64.0, 0.0, 0.0], log.clone())?,
        part("chorus", vec![65.0, 69.0, 72.0, 0.0], log.clone())?,
    ]);
    score.set_bpm(&host, 120.0, 0.0)?;
    score.on_ended(|host: &mut Host<_>, offset| {
        println!("score ended at {:.3}s", host.current_time() + offset);
    });
    score.start(&host, 0.0)?;

    let block = 256;
    while host.current_time() < 4.0 {
        if let Some(end) = score.process(&mut host) {
            println!("last step played at {:.3}s", end);
            break;
        }
        host.ctx.advance(block);
        let now = host.current_time();
        host.synth.prune(now);
    }

    println!();
    if let Ok(log) = log.lock() {
        for line in log.iter() {
            println!("  {}", line);
        }
    }
    println!("\nEvictions: {}", host.synth.evictions());

    host.synth.dispose(&mut host.ctx);
    Ok(())
}
