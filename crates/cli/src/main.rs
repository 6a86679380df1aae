use anyhow::{Context, Result, anyhow, bail};
use paramparse::{ParamParser, Parameter};
use paramparse_schema::{ParseReport, ParserSchema};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "paramparse --schema=params.json [--json] -- <PROGRAM> [ARGS...]";

fn tool_parser() -> Result<ParamParser> {
    let mut parser = ParamParser::new();
    parser.add_usage_string(USAGE);
    parser
        .add_parameter(
            Parameter::new("s,schema")?
                .required()
                .help("JSON file declaring the parameters to check"),
        )?
        .add_parameter(
            Parameter::new("j,json")?
                .flag()
                .help("Print resolved values as JSON"),
        )?
        .add_parameter(
            Parameter::new("v,verbose")?
                .flag()
                .help("Enable debug logging"),
        )?
        .add_parameter(Parameter::new("h,help")?.flag().help("Show this help"))?;
    Ok(parser)
}

fn main() -> Result<()> {
    let argv = std::env::args_os()
        .map(|arg| {
            arg.into_string()
                .map_err(|raw| anyhow!("argument is not valid UTF-8: {}", raw.to_string_lossy()))
        })
        .collect::<Result<Vec<String>>>()?;
    let (own, target) = split_target(&argv);

    let mut tool = tool_parser()?;
    let parsed = tool.parse(own);
    init_tracing(is_set(&tool, "verbose"));

    if is_set(&tool, "help") {
        tool.print_help();
        return Ok(());
    }
    if let Err(err) = parsed {
        eprint!("{}", tool.help());
        bail!("{err}");
    }

    let schema_path = tool
        .arg("schema")
        .map(|p| PathBuf::from(p.value()))
        .context("schema parameter is not registered")?;
    check(&schema_path, target, is_set(&tool, "json"))
}

fn is_set(parser: &ParamParser, alias: &str) -> bool {
    parser.arg(alias).is_some_and(|p| p.is_parsed())
}

/// Split argv at the first `--`: our own options before it, the checked
/// program's argv after it.
fn split_target(argv: &[String]) -> (&[String], &[String]) {
    match argv.iter().position(|arg| arg == "--") {
        Some(idx) => (&argv[..idx], &argv[idx + 1..]),
        None => (argv, &argv[argv.len()..]),
    }
}

fn check(schema_path: &Path, target: &[String], json: bool) -> Result<()> {
    tracing::debug!(schema = %schema_path.display(), "loading schema");
    let bytes = fs::read(schema_path)
        .with_context(|| format!("failed to read schema: {}", schema_path.display()))?;
    let schema = ParserSchema::from_json_slice(&bytes)
        .with_context(|| format!("invalid schema: {}", schema_path.display()))?;
    let mut parser = schema
        .build()
        .with_context(|| format!("invalid parameter declaration in {}", schema_path.display()))?;

    // An empty target still needs a program name in slot 0.
    let argv: Vec<String> = if target.is_empty() {
        vec![schema.name.clone()]
    } else {
        target.to_vec()
    };
    let program = argv[0].clone();

    tracing::debug!(
        program = %program,
        params = parser.parameters_count(),
        tokens = argv.len() - 1,
        "matching target arguments"
    );
    if let Err(err) = parser.parse(&argv) {
        eprint!("{}", target_help(&schema, &parser));
        bail!("{program}: {err}");
    }

    let report = ParseReport::from_parser(program, &parser);
    if json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn target_help(schema: &ParserSchema, parser: &ParamParser) -> String {
    let mut out = String::new();
    if schema.summary.trim().is_empty() {
        out.push_str(&schema.name);
    } else {
        out.push_str(&format!("{} - {}", schema.name, schema.summary.trim()));
    }
    out.push_str("\n\n");
    out.push_str(&parser.help());
    out
}

fn render_report(report: &ParseReport) -> String {
    let width = report.params.keys().map(|k| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, param) in &report.params {
        let state = if param.flag {
            (if param.parsed { "present" } else { "absent" }).to_string()
        } else if param.parsed {
            format!("{} (set)", param.value)
        } else if !param.value.is_empty() {
            format!("{} (default)", param.value)
        } else {
            "(unset)".to_string()
        };
        out.push_str(&format!("{:width$}  {}\n", name, state, width = width));
    }
    out
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
