use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use node_forge_shadergen::{dsl, generator::ShaderGenerator};

#[derive(Debug, Default, Clone)]
struct Cli {
    request: Option<PathBuf>,
    output: Option<PathBuf>,
    inline: bool,
    entry: Option<String>,
    bindings: bool,
}

const USAGE: &str = "supported: --request <request.json>, --output <file.hlsl>, --inline, --entry <name>, --bindings";

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--request" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --request"));
                };
                cli.request = Some(PathBuf::from(v));
                i += 2;
            }
            "--output" | "-o" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output"));
                };
                cli.output = Some(PathBuf::from(v));
                i += 2;
            }
            "--entry" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --entry"));
                };
                cli.entry = Some(v.clone());
                i += 2;
            }
            "--inline" => {
                cli.inline = true;
                i += 1;
            }
            "--bindings" => {
                cli.bindings = true;
                i += 1;
            }
            "--version" => {
                println!("node-forge-shadergen {}", ShaderGenerator::VERSION_STRING);
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("unknown argument: {other} ({USAGE})"));
            }
        }
    }
    Ok(cli)
}

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let Some(request_path) = cli.request.as_deref() else {
        return Err(anyhow!("--request is required ({USAGE})"));
    };
    let mut request = dsl::load_request_from_path(request_path)?;
    if cli.inline {
        request.options.inline = true;
    }
    if let Some(entry) = cli.entry {
        request.entry_name = entry;
    }

    let mut generator = ShaderGenerator::new();
    let compiled = generator
        .compile_request(&request)
        .with_context(|| format!("failed to compile {}", request_path.display()))?;
    eprintln!(
        "[shadergen] {}: {} nodes, {} textures, inline={}",
        request.entry_name,
        request.graph.nodes.len(),
        compiled.texture_slots.len(),
        request.options.inline
    );

    match cli.output.as_deref() {
        Some(path) => {
            std::fs::write(path, &compiled.source)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("[shadergen] saved: {}", path.display());
        }
        None if !cli.bindings => print!("{}", compiled.source),
        None => {}
    }

    if cli.bindings {
        let bindings = serde_json::json!({
            "textureSlots": compiled.texture_slots,
            "samplerSlots": compiled.sampler_slots,
        });
        println!("{}", serde_json::to_string_pretty(&bindings)?);
    }
    Ok(())
}
