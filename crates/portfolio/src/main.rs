mod cli;
mod paths;
mod run;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use cli::{Command, ListArgs, ShowArgs, ShuffleArgs, ThemesAction};
use paths::{load_themes, LoadedThemes};
use themes::{GradientShape, VariantPayload, VariantSummary};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Themes(themes_cmd)) => {
            handle_themes_command(themes_cmd.action, cli.config.as_deref())
        }
        None => run::run(cli.run, cli.config.as_deref()),
    }
}

fn handle_themes_command(action: ThemesAction, config: Option<&Path>) -> Result<()> {
    let loaded = load_themes(config)?;

    match action {
        ThemesAction::List(args) => run_themes_list(&loaded, &args),
        ThemesAction::Show(args) => run_themes_show(&loaded, &args),
        ThemesAction::Shuffle(args) => run_themes_shuffle(&loaded, &args),
    }
}

fn run_themes_list(loaded: &LoadedThemes, args: &ListArgs) -> Result<()> {
    let variants: Vec<_> = if args.all {
        loaded.registry.iter().collect()
    } else {
        loaded.registry.list_enabled()
    };

    if args.json {
        let summaries: Vec<VariantSummary> =
            variants.into_iter().map(VariantSummary::from).collect();
        let json = serde_json::to_string_pretty(&summaries).context("failed to encode themes")?;
        println!("{json}");
        return Ok(());
    }

    if variants.is_empty() {
        println!("No themes are enabled.");
        return Ok(());
    }

    let default_key = loaded.registry.default_variant().key();
    for variant in variants {
        let marker = if variant.key() == default_key { '*' } else { ' ' };
        println!(
            "{marker} {:<16} {:<12} {:<8} {}",
            variant.key(),
            variant.kind(),
            if variant.is_enabled() {
                "enabled"
            } else {
                "disabled"
            },
            variant.display_name()
        );
    }
    Ok(())
}

fn run_themes_show(loaded: &LoadedThemes, args: &ShowArgs) -> Result<()> {
    let variant = loaded.registry.resolve(&args.key)?;
    println!("key:        {}", variant.key());
    println!("name:       {}", variant.display_name());
    println!("kind:       {}", variant.kind());
    println!(
        "enabled:    {}",
        if variant.is_enabled() { "yes" } else { "no" }
    );
    println!("preview:    {}", variant.preview());

    if let VariantPayload::Gradient(style) = variant.payload() {
        println!("class:      {}", style.class);
        println!("css:        {}", style.css);
        match style.shape {
            GradientShape::Linear { angle_deg } => println!("shape:      linear {angle_deg}deg"),
            GradientShape::Radial => println!("shape:      radial"),
        }
        let stops: Vec<String> = style.stops.iter().map(ToString::to_string).collect();
        println!("stops:      {}", stops.join(" "));
        println!("animated:   {}", if style.animated { "yes" } else { "no" });
    }

    let source = variant.shader_source();
    let bindings = source.bindings();
    println!("bindings:");
    println!("  position:   {}", bindings.position);
    println!("  resolution: {}", bindings.resolution);
    println!("  time:       {}", bindings.time);
    println!("  speed:      {}", bindings.speed);
    println!("  hue:        {}", bindings.hue);
    println!("  saturation: {}", bindings.saturation);
    println!("  intensity:  {}", bindings.intensity);
    println!(
        "vertex:     {} lines, {} bytes",
        source.vertex().lines().count(),
        source.vertex().len()
    );
    println!(
        "fragment:   {} lines, {} bytes",
        source.fragment().lines().count(),
        source.fragment().len()
    );
    match shaderhost::gpu::check_source(&source) {
        Ok(()) => println!("check:      ok"),
        Err(err) => println!("check:      {err}"),
    }
    Ok(())
}

fn run_themes_shuffle(loaded: &LoadedThemes, args: &ShuffleArgs) -> Result<()> {
    let registry = &loaded.registry;
    let current = match &args.from {
        Some(key) => registry.resolve(key)?.key(),
        None => registry.default_variant().key(),
    };
    let mut rng = run::seeded_rng(args.seed);
    let next = registry
        .pick_random_other(current, &mut rng)
        .ok_or_else(|| anyhow!("no themes are enabled"))?;
    println!("{next}");
    Ok(())
}
