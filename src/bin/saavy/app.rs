//! Demo session: a two-part score driving a lead and a bass synth.

use color_eyre::eyre::{eyre, Result as EyreResult};
use tracing::{info, warn};

use saavy_sound::{
    sequencing::{Duration, Part, Phrase, Score},
    synth::{MonoSynth, PolySynth},
    voices, AudioContext, EngineConfig, TimeBase,
};

/// Everything the phrase callbacks touch.
pub struct Host {
    ctx: AudioContext,
    lead: PolySynth<MonoSynth>,
    bass: PolySynth<MonoSynth>,
    notes: u64,
    steps: u64,
    failed: u64,
}

impl TimeBase for Host {
    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }
}

impl Host {
    fn play(&mut self, bass: bool, note: f32, offset: f64, sustain: f64) {
        let synth = if bass { &mut self.bass } else { &mut self.lead };
        match synth.play(&mut self.ctx, note as u8, 0.7, offset, Some(sustain)) {
            Ok(_) => self.notes += 1,
            Err(err) => {
                warn!(%err, note, "note failed");
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub seconds: f64,
    pub notes: u64,
    pub steps: u64,
    pub evictions: u64,
    pub peak_voices: usize,
    pub failed: u64,
    pub ended_at: Option<f64>,
}

pub struct Session {
    host: Host,
    score: Score<Host>,
    looping: bool,
}

impl Session {
    pub fn new(config: EngineConfig, looping: bool) -> EyreResult<Self> {
        let pool = config.default_voices;
        let mut ctx = AudioContext::new(config)?;
        let lead = PolySynth::new(&mut ctx, pool, voices::lead)?;
        let bass = PolySynth::new(&mut ctx, pool, voices::bass)?;

        let verse = Self::part(
            &ctx,
            vec![60.0, 0.0, 63.0, 65.0, 0.0, 63.0, 67.0, 0.0],
            vec![36.0, 0.0, 0.0, 0.0, 43.0, 0.0, 0.0, 0.0],
        )?;
        let chorus = Self::part(
            &ctx,
            vec![67.0, 70.0, 72.0, 0.0, 70.0, 67.0, 65.0, 63.0],
            vec![39.0, 0.0, 39.0, 0.0, 41.0, 0.0, 43.0, 0.0],
        )?;

        Ok(Self {
            host: Host {
                ctx,
                lead,
                bass,
                notes: 0,
                steps: 0,
                failed: 0,
            },
            score: Score::new(vec![verse, chorus]),
            looping,
        })
    }

    fn part(ctx: &AudioContext, melody: Vec<f32>, bassline: Vec<f32>) -> EyreResult<Part<Host>> {
        let config = ctx.config();
        let mut part = Part::with_config(0, Duration::EIGHTH, config)?;
        part.set_bpm(ctx, config.default_bpm, 0.0)?;
        let sustain = part.period() * 0.8;

        part.add_phrase(Phrase::new(
            "melody",
            move |host: &mut Host, offset, note| host.play(false, note, offset, sustain),
            melody,
        ));
        part.add_phrase(Phrase::new(
            "bass",
            move |host: &mut Host, offset, note| host.play(true, note, offset, sustain * 3.0),
            bassline,
        ));
        part.on_step(|host: &mut Host, _| host.steps += 1);
        Ok(part)
    }

    /// Advance the audio clock block by block for `seconds`, letting the
    /// score schedule whatever falls due.
    pub fn run(&mut self, seconds: f64, block: usize) -> EyreResult<Report> {
        if block == 0 {
            return Err(eyre!("block size must be at least one frame"));
        }
        if self.looping {
            self.score.loop_score(&self.host, 0.0)?;
        } else {
            self.score.start(&self.host, 0.0)?;
        }
        info!(seconds, block, looping = self.looping, "transport started");

        let mut peak_voices = 0;
        let mut ended_at = None;
        while self.host.ctx.current_time() < seconds {
            if let Some(end) = self.score.process(&mut self.host) {
                ended_at = Some(end);
            }
            self.host.ctx.advance(block);

            let now = self.host.ctx.current_time();
            let in_use =
                self.host.lead.voices_in_use_at(now) + self.host.bass.voices_in_use_at(now);
            peak_voices = peak_voices.max(in_use);
            self.host.lead.prune(now);
            self.host.bass.prune(now);

            // Let the last release tails ring out, then stop.
            if ended_at.is_some_and(|end| now > end + 1.0) {
                break;
            }
        }

        Ok(Report {
            seconds: self.host.ctx.current_time(),
            notes: self.host.notes,
            steps: self.host.steps,
            evictions: self.host.lead.evictions() + self.host.bass.evictions(),
            peak_voices,
            failed: self.host.failed,
            ended_at,
        })
    }

    pub fn dispose(&mut self) {
        self.host.lead.dispose(&mut self.host.ctx);
        self.host.bass.dispose(&mut self.host.ctx);
        let leftover = self.host.ctx.dispose_all();
        info!(leftover, "session disposed");
    }
}
