/// Prints an ADSR curve, then retriggers it mid-attack to show the release
/// picking up from the current level instead of jumping.
use saavy_sound::{
    graph::{Destination, ParamId, ParamKind},
    synth::Envelope,
    AudioContext, Result,
};

fn print_curve(ctx: &AudioContext, env: &Envelope, until: f64) {
    let mut t = 0.0;
    while t <= until {
        let level = env.level_at(ctx, t);
        let bar = "#".repeat((level * 40.0).round() as usize);
        let stage = format!("{:?}", env.stage_at(t));
        println!("  {:>5.2}s {:<8} {:.3} {}", t, stage, level, bar);
        t += 0.05;
    }
}

fn main() -> Result<()> {
    println!("=== Envelope Demo ===\n");

    let mut ctx = AudioContext::default();
    let amp = ctx.graph_mut().create_gain(0.0);
    let target = Destination::Param(ParamId::new(amp, ParamKind::Gain));

    let mut env = Envelope::new(&mut ctx)?;
    env.set_adsr(0.1, 0.2, 0.5, 0.3)?;

    println!("1. Full note: attack 0.1s, decay 0.2s, sustain 50%, release 0.3s");
    env.play(&mut ctx, Some(target), 0.0, 0.2)?;
    print_curve(&ctx, &env, 1.0);

    println!("\n2. Release at 0.05s, halfway up the attack");
    let mut early = Envelope::new(&mut ctx)?;
    early.set_adsr(0.1, 0.2, 0.5, 0.3)?;
    early.trigger_attack(&mut ctx, Some(target), 0.0)?;
    early.trigger_release(&mut ctx, None, 0.05)?;
    print_curve(&ctx, &early, 0.5);

    println!("\n3. Exponential mode");
    let mut exp = Envelope::new(&mut ctx)?;
    exp.set_adsr(0.1, 0.2, 0.5, 0.3)?;
    exp.set_exp(true);
    exp.play(&mut ctx, Some(target), 0.0, 0.2)?;
    print_curve(&ctx, &exp, 1.0);

    for env in [&mut env, &mut early, &mut exp] {
        env.dispose(&mut ctx);
    }
    Ok(())
}
