/// Demonstrates voice allocation without a sound card.
/// Queues note requests the way a UI thread would, then drains them on the
/// "audio" side and prints which slot each note landed on.
use rtrb::RingBuffer;
use saavy_sound::{
    synth::{MonoSynth, PolySynth, SynthMessage, Voice},
    AudioContext, Result,
};

fn main() -> Result<()> {
    println!("=== Polyphony Demo (Offline) ===\n");

    let mut ctx = AudioContext::default();
    let max_voices = 3;
    let block_size = 256;

    let (mut tx, mut rx) = RingBuffer::<SynthMessage>::new(64);
    let mut poly = PolySynth::new(&mut ctx, max_voices, MonoSynth::new)?;
    poly.set_adsr(0.05, 0.1, 0.6, 0.2)?;
    println!("Created PolySynth with {} voices\n", max_voices);

    // C major chord, then one more note than the pool holds.
    println!("Queueing C major chord plus B4:");
    for (i, note) in [60_u8, 64, 67, 71].into_iter().enumerate() {
        println!("  Note On: {} at +{:.2}s", note, i as f64 * 0.1);
        let _ = tx.push(SynthMessage::NoteOn {
            note: note.into(),
            velocity: 0.8,
            time_from_now: i as f64 * 0.1,
        });
    }

    let handled = poly.process_messages(&mut ctx, &mut rx)?;
    println!("\nAudio side handled {} messages", handled);

    for note in [60_u8, 64, 67, 71] {
        match poly.slot_at(note, 0.35) {
            Some(slot) => println!("  {} -> slot {}", note, slot),
            None => println!("  {} -> stolen", note),
        }
    }
    println!("Evictions: {}", poly.evictions());
    println!("Voices in use at 0.35s: {}\n", poly.voices_in_use_at(0.35));

    println!("Releasing everything at +0.5s");
    let _ = tx.push(SynthMessage::NoteOff {
        note: 64_u8.into(),
        time_from_now: 0.5,
    });
    let _ = tx.push(SynthMessage::NoteOff {
        note: 67_u8.into(),
        time_from_now: 0.5,
    });
    let _ = tx.push(SynthMessage::NoteOff {
        note: 71_u8.into(),
        time_from_now: 0.5,
    });
    poly.process_messages(&mut ctx, &mut rx)?;

    // Walk the clock forward a block at a time and watch the tail die out.
    println!("\nLevels per voice:");
    while ctx.current_time() < 1.0 {
        let now = ctx.current_time();
        let levels: Vec<String> = poly
            .voices()
            .iter()
            .map(|voice| format!("{:.3}", voice.level_at(&ctx, now)))
            .collect();
        if ctx.current_frame() % (block_size as u64 * 16) == 0 {
            println!("  t={:.2}s  [{}]", now, levels.join(", "));
        }
        ctx.advance(block_size);
        poly.prune(ctx.current_time());
    }

    poly.dispose(&mut ctx);
    println!("\nDisposed; {} sounds left registered", ctx.registry().len());
    Ok(())
}
