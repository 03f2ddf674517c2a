use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use robolink_blocks::catalog::BlockCatalog;
use robolink_blocks::clock::SystemClock;
use robolink_blocks::editor::Editor;
use robolink_blocks::generator::{ProgramSubmission, preflight};
use robolink_blocks::registry::VariableRegistry;
use robolink_blocks::script::GestureScript;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a block editing session and print the robot program", long_about = None)]
struct Cli {
    /// Gesture script (JSON)
    #[arg(value_name = "SCRIPT")]
    script: Utf8PathBuf,

    /// Block catalog to use instead of the built-in robot palette
    #[arg(long, value_name = "FILE")]
    catalog: Option<Utf8PathBuf>,

    /// Print the POST request for this executor endpoint instead of the bare program
    #[arg(long, value_name = "ENDPOINT")]
    submit: Option<String>,

    /// Fail if the program does not pass preflight checks
    #[arg(long)]
    check: bool,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let catalog = match &cli.catalog {
        Some(path) => BlockCatalog::load(path)?,
        None => BlockCatalog::robot_default(),
    };
    let script = GestureScript::load(&cli.script)?;
    let mut editor = Editor::new(catalog, VariableRegistry::default(), SystemClock);
    let report = script
        .run(&mut editor)
        .with_context(|| format!("Failed to replay {}", cli.script))?;
    for (index, err) in &report.rejected {
        eprintln!("step {index}: {err}");
    }

    let program = editor.program();
    let issues = preflight(&program, editor.catalog(), editor.registry());
    for issue in &issues {
        eprintln!("preflight: {issue}");
    }
    if cli.check && !issues.is_empty() {
        anyhow::bail!("{} preflight issue(s)", issues.len());
    }

    let json = if cli.compact {
        serde_json::to_string(&program)?
    } else {
        serde_json::to_string_pretty(&program)?
    };
    match &cli.submit {
        Some(endpoint) => {
            let submission = ProgramSubmission::new(endpoint, &program)?;
            println!("POST {}", submission.endpoint);
            for (name, value) in submission.headers() {
                println!("{name}: {value}");
            }
            println!();
            println!("{json}");
        }
        None => println!("{json}"),
    }
    Ok(())
}
