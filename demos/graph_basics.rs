/// Demonstrates the node graph and effect lifecycle.
/// Builds a voice, runs it through a chain of effects, reads parameters back
/// and disposes everything.
use saavy_sound::{
    graph::{Compressor, CompressorSettings, Delay, Effect, Filter, Reverb},
    synth::{MonoSynth, Voice},
    AudioContext, Result,
};

fn main() -> Result<()> {
    println!("=== Audio Graph Basics Demo ===\n");

    let mut ctx = AudioContext::default();
    let destination = ctx.destination();

    println!("1. A single voice");
    let mut voice = MonoSynth::new(&mut ctx)?;
    voice.play(&mut ctx, 69_u8.into(), 0.8, 0.0, Some(0.5))?;
    println!("   Level at 0.1s: {:.3}", voice.level_at(&ctx, 0.1));
    println!("   Nodes in graph: {}", ctx.graph().len());

    println!("\n2. Voice -> filter -> delay -> reverb");
    let mut filter = Filter::low_pass(&mut ctx)?;
    let mut delay = Delay::new(&mut ctx)?;
    let mut reverb = Reverb::new(&mut ctx)?;

    voice.disconnect(&mut ctx);
    filter.process(&mut ctx, voice.output(), 800.0, 2.0, 0.0)?;
    delay.delay_time(&mut ctx, 0.25)?;
    delay.feedback(&mut ctx, 0.4)?;
    reverb.set(&mut ctx, 2.0, 3.0, false)?;
    filter.disconnect(&mut ctx);
    delay.disconnect(&mut ctx);
    filter.chain(&mut ctx, &[&delay, &reverb])?;
    println!("   Cutoff: {:.0} Hz", filter.freq_at(&ctx, 0.0));
    println!("   Delay time: {:.2}s", delay.delay_time_at(&ctx, 0.0));
    println!(
        "   Reverb tail: {} samples",
        reverb.impulse_len(ctx.sample_rate())
    );

    println!("\n3. Dry/wet and output level");
    delay.drywet(&mut ctx, 0.3)?;
    reverb.amp(&mut ctx, 0.5, 0.5, 0.0)?;
    println!("   Reverb level at 0.25s: {:.3}", reverb.core().level_at(&ctx, 0.25));
    println!("   Reverb level at 0.5s:  {:.3}", reverb.core().level_at(&ctx, 0.5));

    println!("\n4. A compressor on the master bus");
    let mut comp = Compressor::new(&mut ctx)?;
    reverb.disconnect(&mut ctx);
    reverb.connect(&mut ctx, comp.input().into())?;
    comp.set(
        &mut ctx,
        CompressorSettings {
            ratio: 4.0,
            threshold: -18.0,
            ..CompressorSettings::default()
        },
    )?;
    println!("   {:?}", comp.settings_at(&ctx, 0.0));
    println!(
        "   Compressor reaches destination: {}",
        ctx.graph().is_connected(comp.output(), destination)
    );

    println!("\n5. Dispose");
    println!("   Registered sounds before: {}", ctx.registry().len());
    voice.dispose(&mut ctx);
    filter.dispose(&mut ctx);
    delay.dispose(&mut ctx);
    comp.dispose(&mut ctx);
    reverb.dispose(&mut ctx);
    reverb.dispose(&mut ctx);
    println!("   Registered sounds after:  {}", ctx.registry().len());
    println!("   Nodes left in graph: {}", ctx.graph().len());
    Ok(())
}
