//! The `check` command: drives one engine invocation and maps the
//! result onto the process exit-code contract.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use upgradeguard_engine::{
    analyze_upgrade, AnalysisRequest, EngineError, EngineResult, Severity, Verdict,
};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Address of the deployed proxy (0x-prefixed).
    #[arg(long)]
    pub proxy: String,

    /// Path to the old implementation's Solidity source file.
    #[arg(long)]
    pub old: PathBuf,

    /// Path to the new implementation's Solidity source file.
    #[arg(long)]
    pub new: PathBuf,

    /// JSON-RPC endpoint of the chain the proxy lives on.
    #[arg(long)]
    pub rpc: String,

    /// Contract name, when the source file defines more than one.
    #[arg(long)]
    pub contract: Option<String>,

    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the rendering to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

pub async fn execute(args: CheckArgs) -> i32 {
    match run(args).await {
        Ok(code) => code,
        Err(RunFailure::Engine(error)) => {
            emit_diagnostic(&error);
            if error.is_input_error() {
                10
            } else {
                12
            }
        }
        Err(RunFailure::Io(error)) => {
            eprintln!("{error:#}");
            12
        }
    }
}

enum RunFailure {
    Engine(EngineError),
    Io(anyhow::Error),
}

impl From<EngineError> for RunFailure {
    fn from(error: EngineError) -> Self {
        Self::Engine(error)
    }
}

async fn run(args: CheckArgs) -> Result<i32, RunFailure> {
    let request = AnalysisRequest {
        proxy_address: args.proxy.clone(),
        old_implementation: args.old.clone(),
        new_implementation: args.new.clone(),
        rpc_endpoint: args.rpc.clone(),
        contract_name: args.contract.clone(),
    };

    let result = analyze_upgrade(&request).await?;

    let rendering = match args.format {
        OutputFormat::Text => render_text(&result),
        OutputFormat::Markdown => result.report_markdown.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&result)
            .context("serializing result")
            .map_err(RunFailure::Io)?,
    };

    match &args.output {
        Some(path) => std::fs::write(path, &rendering)
            .with_context(|| format!("writing report to {}", path.display()))
            .map_err(RunFailure::Io)?,
        None => println!("{rendering}"),
    }

    Ok(result.exit_code())
}

fn emit_diagnostic(error: &EngineError) {
    let diagnostic = serde_json::json!({
        "error": error.kind(),
        "message": error.to_string(),
    });
    eprintln!("{diagnostic}");
}

fn verdict_badge(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Safe => "SAFE".green().bold(),
        Verdict::Unsafe => "UNSAFE".red().bold(),
        Verdict::ReviewRequired => "REVIEW REQUIRED".yellow().bold(),
        Verdict::Incomplete => "INCOMPLETE".blue().bold(),
    }
}

fn severity_badge(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".bright_red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".bright_yellow(),
    }
}

fn render_text(result: &EngineResult) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "Verdict: {}", verdict_badge(result.verdict));
    if let Some(severity) = result.highest_severity {
        let _ = writeln!(out, "Highest severity: {}", severity_badge(severity));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Analyzers:");
    for (name, status) in &result.analyzer_status {
        let status = match status {
            upgradeguard_engine::AnalyzerStatus::Completed => "completed".green(),
            upgradeguard_engine::AnalyzerStatus::Skipped { reason } => {
                format!("skipped ({reason})").bright_black()
            }
            upgradeguard_engine::AnalyzerStatus::Errored { message } => {
                format!("errored ({message})").red()
            }
        };
        let _ = writeln!(out, "  {name:<28} {status}");
    }
    let _ = writeln!(out);

    if result.findings.is_empty() {
        let _ = writeln!(out, "No findings.");
        return out;
    }

    let _ = writeln!(out, "Findings ({}):", result.findings.len());
    for finding in &result.findings {
        let _ = writeln!(
            out,
            "\n  [{}] {} {}",
            finding.code,
            severity_badge(finding.severity),
            finding.title.bold()
        );
        let _ = writeln!(out, "    {}", finding.description);
        if !finding.remediation.is_empty() {
            let _ = writeln!(out, "    fix: {}", finding.remediation);
        }
    }

    out
}
