//! CLI: compile specs, validate documents offline, run live queries.
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use sops::backend::OpenAiBackend;
use sops::config::{BackendArgs, OpenAiConfig};
use sops::{normalize, CompiledSchema, RawSpec, Session, ValidationError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile output-shape specs into strict JSON schemas, validate JSON against them, or query a model with them
#[derive(Parser, Debug)]
#[command(name = "sops", version)]
pub struct CommandLineInterface {
    /// log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// log line format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a spec file and print the strict response format
    Compile(CompileOut),
    /// validate JSON documents against a spec file
    Validate(ValidateIn),
    /// plain text query, no schema
    Plain(PlainQuery),
    /// structured query constrained and validated by a spec file
    Structured(StructuredQuery),
    /// yes/no query
    Boolean(PlainQuery),
    /// typed list query
    List(ListQuery),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq filter applied to each document; every output is validated separately
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug)]
struct CompileOut {
    /// JSON spec file
    #[arg(long)]
    spec: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateIn {
    /// JSON spec file
    #[arg(long)]
    spec: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(Args, Debug)]
struct PlainQuery {
    /// prompt text, or '-' to read it from stdin
    #[arg(long)]
    prompt: String,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args, Debug)]
struct StructuredQuery {
    /// JSON spec file
    #[arg(long)]
    spec: PathBuf,

    /// prompt text, or '-' to read it from stdin
    #[arg(long)]
    prompt: String,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args, Debug)]
struct ListQuery {
    /// element spec as JSON (e.g. '{"name": "string"}') or a bare marker (e.g. integer)
    #[arg(long)]
    of: String,

    /// prompt text, or '-' to read it from stdin
    #[arg(long)]
    prompt: String,

    #[command(flatten)]
    backend: BackendArgs,
}

/// One document to validate, with a label saying where it came from.
#[derive(Debug, Clone, PartialEq)]
struct Document {
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut docs = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;

            let mut parsed = Vec::new();
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON line ({label})"))?;
                    parsed.push(Document { label, value });
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                parsed.push(Document { label: source_path_str.clone(), value });
            }

            for doc in parsed {
                docs.extend(self.select(doc)?);
            }
        }
        Ok(docs)
    }

    fn select(&self, doc: Document) -> Result<Vec<Document>> {
        let value = match self.json_pointer.as_deref() {
            None => doc.value,
            Some(ptr) => doc
                .value
                .pointer(ptr)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {ptr} matched nothing in {}", doc.label))?,
        };
        match self.jq_expr.as_deref() {
            None => Ok(vec![Document { label: doc.label, value }]),
            Some(jq_expr) => {
                let outputs = crate::jq_exec::apply_filter(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {}", doc.label))?;
                let many = outputs.len() > 1;
                Ok(outputs
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| Document {
                        label: if many { format!("{}#{i}", doc.label) } else { doc.label.clone() },
                        value,
                    })
                    .collect())
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        match self.log_format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Compile(target) => {
                let schema = load_compiled_schema(&target.spec)?;
                let schema_src = serde_json::to_string_pretty(&schema.response_format())?;
                write_output(target.out.as_deref(), &schema_src)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Validate(target) => {
                let schema = load_compiled_schema(&target.spec)?;
                let docs = target.input_settings.load_documents()?;
                let results = validate_all(&schema, &docs);

                let mut failed = 0usize;
                for (doc, result) in docs.iter().zip(&results) {
                    match result {
                        Ok(()) => println!("{} {}", "pass".green().bold(), doc.label),
                        Err(err) => {
                            failed += 1;
                            println!("{} {}: {err}", "FAIL".red().bold(), doc.label);
                        }
                    }
                }
                tracing::info!(total = docs.len(), failed, "validation finished");
                Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
            Command::Plain(query) => {
                let session = build_session(&query.backend)?;
                let text = session.plain(&read_prompt(&query.prompt)?)?;
                println!("{text}");
                Ok(ExitCode::SUCCESS)
            }
            Command::Structured(query) => {
                let schema = load_compiled_schema(&query.spec)?;
                let session = build_session(&query.backend)?;
                let value = session.structured(&read_prompt(&query.prompt)?, &schema)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(ExitCode::SUCCESS)
            }
            Command::Boolean(query) => {
                let session = build_session(&query.backend)?;
                let answer = session.boolean(&read_prompt(&query.prompt)?)?;
                println!("{answer}");
                Ok(ExitCode::SUCCESS)
            }
            Command::List(query) => {
                let element = normalize(&parse_inline_spec(&query.of))
                    .context("invalid --of element spec")?;
                let session = build_session(&query.backend)?;
                let items = session.typed_list(&read_prompt(&query.prompt)?, element)?;
                println!("{}", serde_json::to_string_pretty(&items)?);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_compiled_schema(path: &Path) -> Result<CompiledSchema> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec file {}", path.display()))?;
    let json = serde_json::from_str::<Value>(&source)
        .with_context(|| format!("spec file {} is not valid JSON", path.display()))?;
    CompiledSchema::from_raw(&RawSpec::from_json(&json))
        .with_context(|| format!("invalid spec in {}", path.display()))
}

/// `--of` accepts JSON (`{"a": "string"}`, `["integer"]`, `"string?"`) or a bare marker (`integer`).
fn parse_inline_spec(src: &str) -> RawSpec {
    match serde_json::from_str::<Value>(src) {
        Ok(json) => RawSpec::from_json(&json),
        Err(_) => RawSpec::from_json(&Value::String(src.to_string())),
    }
}

/// Validates every document against one shared schema, in parallel, keeping input order.
fn validate_all(schema: &CompiledSchema, docs: &[Document]) -> Vec<Result<(), ValidationError>> {
    docs.par_iter().map(|doc| schema.validate(&doc.value)).collect()
}

fn build_session(args: &BackendArgs) -> Result<Session> {
    let config = OpenAiConfig::try_from(args)?;
    tracing::debug!(model = %config.model, base_url = %config.base_url, "configuring backend");
    Ok(Session::new(OpenAiBackend::new(config)?))
}

fn read_prompt(prompt: &str) -> Result<String> {
    if prompt != "-" {
        return Ok(prompt.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("failed to read prompt from stdin")?;
    Ok(buf)
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents)
                .with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(input: Vec<String>) -> InputSettings {
        InputSettings { ndjson: false, json_pointer: None, jq_expr: None, input }
    }

    fn profile_schema() -> CompiledSchema {
        CompiledSchema::from_raw(&RawSpec::from_json(&json!({"name": "string", "age": "integer"}))).unwrap()
    }

    #[test]
    fn ndjson_lines_become_labelled_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.ndjson");
        std::fs::write(&path, "{\"name\": \"a\", \"age\": 1}\n\n{\"name\": \"b\", \"age\": \"2\"}\n").unwrap();

        let mut input = settings(vec![path.to_string_lossy().to_string()]);
        input.ndjson = true;
        let docs = input.load_documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[1].label.ends_with("people.ndjson:3"), "{}", docs[1].label);

        let results = validate_all(&profile_schema(), &docs);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().path.to_string(), "$.age");
    }

    #[test]
    fn glob_and_pointer_select_documents() {
        let dir = tempfile::tempdir().unwrap();
        for (name, age) in [("a.json", 1), ("b.json", 2)] {
            let body = json!({"payload": {"name": name, "age": age}});
            std::fs::write(dir.path().join(name), body.to_string()).unwrap();
        }
        let pattern = dir.path().join("*.json").to_string_lossy().to_string();
        let mut input = settings(vec![pattern]);
        input.json_pointer = Some("/payload".into());

        let docs = input.load_documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert!(validate_all(&profile_schema(), &docs).iter().all(Result::is_ok));
    }

    #[test]
    fn glob_without_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.nothing").to_string_lossy().to_string();
        assert!(settings(vec![pattern]).load_documents().is_err());
    }

    #[test]
    fn inline_element_specs() {
        assert_eq!(parse_inline_spec("integer"), RawSpec::integer());
        assert_eq!(parse_inline_spec("\"string?\""), RawSpec::optional(RawSpec::string()));
        assert_eq!(
            parse_inline_spec(r#"{"name": "string"}"#),
            RawSpec::object([("name", RawSpec::string())])
        );
    }

    #[test]
    fn cli_parses_validate_command() {
        let cli = CommandLineInterface::try_parse_from([
            "sops", "validate", "--spec", "spec.json", "--input", "a.json", "b.json", "--ndjson",
        ])
        .unwrap();
        let Command::Validate(target) = cli.cmd else { panic!("expected validate") };
        assert_eq!(target.input_settings.input, vec!["a.json", "b.json"]);
        assert!(target.input_settings.ndjson);
    }
}
