use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use specbind::{Controller, Value};

#[derive(Parser, Debug)]
#[command(name = "specbind", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind an expression or template to a JSON data model and print its value,
    /// then apply writes and print every recomputed value.
    Eval(EvalArgs),
    /// Print the token stream, parsed tree and field set of an expression or template.
    Parse(ParseArgs),
}

#[derive(Parser, Debug)]
struct EvalArgs {
    /// Expression (or template with `--template`) to evaluate.
    source: String,

    /// Treat SOURCE as template text rather than an expression.
    #[arg(long)]
    template: bool,

    /// Data model JSON file. Defaults to an empty object.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Spec row JSON file supplying `@` properties.
    #[arg(long)]
    row: Option<PathBuf>,

    /// Dotted path of the scope to evaluate in, relative to the data root.
    #[arg(long, default_value = "")]
    path: String,

    /// Write `KEY=JSON` through the bound scope after binding. Repeatable.
    #[arg(long = "watch-set", value_name = "KEY=JSON")]
    watch_set: Vec<String>,
}

#[derive(Parser, Debug)]
struct ParseArgs {
    /// Expression (or template with `--template`) to parse.
    source: String,

    /// Treat SOURCE as template text rather than an expression.
    #[arg(long)]
    template: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Eval(args) => cmd_eval(args),
        Command::Parse(args) => cmd_parse(args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let f = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse JSON '{}'", path.display()))
}

fn render(value: &Value) -> String {
    match value.to_json() {
        Ok(json) => json.to_string(),
        Err(err) => {
            tracing::warn!(%err, "value cannot be shown as JSON");
            value.to_text()
        }
    }
}

fn cmd_eval(args: EvalArgs) -> anyhow::Result<()> {
    let data = match &args.data {
        Some(path) => read_json(path)?,
        None => serde_json::json!({}),
    };
    let row = match &args.row {
        Some(path) => Value::from_json(&read_json(path)?),
        None => Value::Null,
    };

    let controller = Controller::new(&Value::from_json(&data)).context("bind data model")?;
    let scope = controller
        .bind(&args.path)
        .with_context(|| format!("resolve scope '{}'", args.path))?;

    let updates = Rc::new(std::cell::Cell::new(0usize));
    let on_change = {
        let updates = Rc::clone(&updates);
        move |value: &Value| {
            updates.set(updates.get() + 1);
            println!("{}", render(value));
        }
    };
    let bound = if args.template {
        scope.binding().bind_template(&args.source, on_change, &row)
    } else {
        scope.binding().bind_expr(&args.source, on_change, &row)
    }
    .with_context(|| format!("bind '{}'", args.source))?;
    tracing::info!(fields = ?bound.fields, live = bound.id.is_some(), "bound");

    for write in &args.watch_set {
        let (key, json) = write
            .split_once('=')
            .with_context(|| format!("--watch-set '{write}' is not KEY=JSON"))?;
        let json: serde_json::Value =
            serde_json::from_str(json).with_context(|| format!("parse value for '{key}'"))?;
        scope
            .binding()
            .set_value(key, Value::from_json(&json))
            .with_context(|| format!("write '{key}'"))?;
    }

    tracing::info!(updates = updates.get(), "done");
    Ok(())
}

fn cmd_parse(args: ParseArgs) -> anyhow::Result<()> {
    let tokens = if args.template {
        specbind::tokenize_literal(&args.source, 0)
    } else {
        specbind::tokenize(&args.source)
    }?;
    for token in &tokens {
        if token.kind != specbind::TokenKind::Space {
            println!("{:>4} {:?} {}", token.offset, token.kind, token.src);
        }
    }

    let expr = specbind::parse(&tokens)?;
    println!("tree: {expr}");
    let fields: Vec<_> = expr.fields().into_iter().collect();
    println!("fields: {}", fields.join(", "));
    Ok(())
}
