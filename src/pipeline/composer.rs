use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::contract::{CONTRACT_VERSION, DEFAULT_RUN_TIMEOUT_SECS};
use crate::detector::{ProjectProfile, ProjectType};
use crate::pipeline::collector::Evidence;
use crate::pipeline::extractor::DocumentationUnit;
use crate::writer::FileWriter;

const INSTRUCTIONS_FILE: &str = "SKILL.md";
const REFERENCES_DIR: &str = "references";
const SCRIPTS_DIR: &str = "scripts";
const VENDOR_DIR: &str = "vendor";

/// Instruction body for repositories nothing matched.
const GENERIC_GUIDANCE: &str = "Inspect the repository layout and run the project manually.";

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub output_dir: PathBuf,
    pub with_wrapper: bool,
    pub vendor: bool,
}

/// A generated script file, staged under `scripts/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
    pub executable: bool,
}

/// The bundle as composed in memory, before any write happens.
#[derive(Debug, Clone)]
pub struct SkillBundle {
    pub instructions: String,
    pub references: Vec<DocumentationUnit>,
    pub scripts: Vec<GeneratedFile>,
    pub vendor: bool,
}

/// Deterministically assemble the in-memory bundle. No I/O here; the same
/// inputs always produce byte-identical content.
pub fn compose(
    profile: &ProjectProfile,
    evidence: &Evidence,
    references: Vec<DocumentationUnit>,
    options: &ComposeOptions,
) -> SkillBundle {
    let instructions = build_instructions(profile, evidence, &references);

    let scripts = if options.with_wrapper {
        vec![
            entrypoint_script(profile, &evidence.metadata.name),
            init_script(profile, &evidence.metadata.name),
        ]
    } else {
        Vec::new()
    };

    SkillBundle {
        instructions,
        references,
        scripts,
        vendor: options.vendor,
    }
}

/// Persist the bundle. All-or-nothing: the full tree is written into a
/// scratch directory next to the target, checked for completeness, then
/// published with a single rename. Any write failure aborts with the
/// failing path and leaves nothing at the target.
pub fn publish(
    bundle: &SkillBundle,
    options: &ComposeOptions,
    source_root: &Path,
    writer: &dyn FileWriter,
) -> Result<()> {
    let output = &options.output_dir;
    if output.exists() {
        bail!("Output path already exists: {}", output.display());
    }

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    writer.create_dir_all(&parent)?;

    let stage = tempfile::Builder::new()
        .prefix(".skillpack-stage-")
        .tempdir_in(&parent)
        .with_context(|| format!("Failed to create staging directory in {}", parent.display()))?;

    let mut planned: Vec<PathBuf> = vec![PathBuf::from(INSTRUCTIONS_FILE)];
    for unit in &bundle.references {
        planned.push(Path::new(REFERENCES_DIR).join(&unit.canonical_name));
    }
    for script in &bundle.scripts {
        planned.push(Path::new(SCRIPTS_DIR).join(&script.name));
    }

    writer.write(
        &stage.path().join(INSTRUCTIONS_FILE),
        bundle.instructions.as_bytes(),
    )?;

    // references/ exists even when empty
    writer.create_dir_all(&stage.path().join(REFERENCES_DIR))?;
    for unit in &bundle.references {
        writer.write(
            &stage.path().join(REFERENCES_DIR).join(&unit.canonical_name),
            unit.content.as_bytes(),
        )?;
    }

    if !bundle.scripts.is_empty() {
        writer.create_dir_all(&stage.path().join(SCRIPTS_DIR))?;
        for script in &bundle.scripts {
            let path = stage.path().join(SCRIPTS_DIR).join(&script.name);
            writer.write(&path, script.content.as_bytes())?;
            if script.executable {
                writer.make_executable(&path)?;
            }
        }
    }

    if bundle.vendor {
        copy_tree(source_root, &stage.path().join(VENDOR_DIR), writer)?;
    }

    // Validate completeness before publishing
    for rel in &planned {
        if !stage.path().join(rel).exists() {
            bail!("Bundle incomplete: missing {}", rel.display());
        }
    }
    if bundle.vendor && !stage.path().join(VENDOR_DIR).is_dir() {
        bail!("Bundle incomplete: missing {}", VENDOR_DIR);
    }

    writer.rename(stage.path(), output).with_context(|| {
        format!("Failed to publish bundle to {}", output.display())
    })?;
    // The staging dir has been moved; TempDir's cleanup of the old path is a
    // no-op.

    info!(
        "Published bundle with {} reference(s) to {}",
        bundle.references.len(),
        output.display()
    );
    Ok(())
}

/// Verbatim copy of the source tree, skipping `.git` and honoring ignore
/// rules.
fn copy_tree(source_root: &Path, dest: &Path, writer: &dyn FileWriter) -> Result<()> {
    writer.create_dir_all(dest)?;
    let walker = WalkBuilder::new(source_root)
        .hidden(false)
        .filter_entry(|entry| entry.file_name() != std::ffi::OsStr::new(".git"))
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry while vendoring: {}", err);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source_root)
            .unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            writer.create_dir_all(&target)?;
        } else {
            writer.copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Bundle-safe name: lowercased, underscores and spaces dashed.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(['_', ' '], "-")
}

fn build_instructions(
    profile: &ProjectProfile,
    evidence: &Evidence,
    references: &[DocumentationUnit],
) -> String {
    let metadata = &evidence.metadata;
    let name = slug(&metadata.name);
    let description = metadata
        .description
        .clone()
        .unwrap_or_else(|| format!("Work with the {} codebase.", metadata.name))
        .replace('\n', " ");
    let entry_point = profile
        .entry_points
        .first()
        .map(String::as_str)
        .unwrap_or("unknown");

    let mut out = format!(
        "---\nname: {}\ndescription: {}\nproject_type: {}\nentry_point: {}\n---\n\n# {}\n\n",
        name,
        description,
        profile.primary_type.as_str(),
        entry_point,
        metadata.name
    );

    let purpose = references
        .iter()
        .find(|u| u.canonical_name.starts_with("README"))
        .and_then(|u| purpose_paragraph(&u.content));
    match purpose {
        Some(paragraph) => {
            out.push_str(&paragraph);
            out.push_str("\n\n");
        }
        None => {
            out.push_str(&format!("Codebase skill for {}.\n\n", metadata.name));
        }
    }

    out.push_str("## Project Type\n\n");
    out.push_str(profile.primary_type.as_str());
    if profile.containerized && profile.primary_type != ProjectType::Container {
        out.push_str(", containerized");
    }
    out.push_str("\n\n");

    if !evidence.tree_listing.is_empty() {
        out.push_str("## Directory Structure\n\n```\n");
        out.push_str(&evidence.tree_listing);
        out.push_str("\n```\n\n");
    }

    out.push_str("## Quick Start\n\n");
    match quick_start_command(profile) {
        Some(command) => {
            out.push_str("```bash\n");
            out.push_str(&command);
            out.push_str("\n```\n\n");
        }
        None => {
            out.push_str(GENERIC_GUIDANCE);
            out.push_str("\n\n");
        }
    }

    if let Some(setup) = profile
        .package_manager
        .as_deref()
        .and_then(install_command)
    {
        out.push_str("### Setup\n\n```bash\n");
        out.push_str(setup);
        out.push_str("\n```\n\n");
    }

    if profile.entry_points.len() > 1 {
        out.push_str("## Entry Points\n\n");
        for entry in &profile.entry_points {
            out.push_str(&format!("- `{}`\n", entry));
        }
        out.push('\n');
    }

    if !references.is_empty() {
        out.push_str("## References\n\n");
        for unit in references {
            out.push_str(&format!(
                "- [{}]({}/{})\n",
                unit.canonical_name, REFERENCES_DIR, unit.canonical_name
            ));
        }
        out.push('\n');
    }

    out
}

/// First meaningful paragraph of the README, bounded to 500 bytes.
fn purpose_paragraph(readme: &str) -> Option<String> {
    for paragraph in readme.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.len() > 50
            && !trimmed.starts_with('#')
            && !trimmed.starts_with("```")
            && !trimmed.starts_with("---")
        {
            let mut end = 500.min(trimmed.len());
            while end > 0 && !trimmed.is_char_boundary(end) {
                end -= 1;
            }
            return Some(trimmed[..end].to_string());
        }
    }
    None
}

/// Fixed project-type → command-pattern table. None means the generic
/// "inspect and run manually" guidance.
fn quick_start_command(profile: &ProjectProfile) -> Option<String> {
    // Command-shaped entries (`make x`, `npm run y`) contain a space; the
    // quick-start wants a runnable file if one was found.
    let entry_file = profile.entry_points.iter().find(|e| !e.contains(' '));

    match profile.primary_type {
        ProjectType::Python => Some(match entry_file {
            Some(entry) => format!("python {}", entry),
            None => "python -m <module>".to_string(),
        }),
        ProjectType::Node => Some(match entry_file {
            Some(entry) => format!("node {}", entry),
            None => "npm start".to_string(),
        }),
        ProjectType::Rust => Some("cargo run".to_string()),
        ProjectType::Go => Some(match entry_file {
            Some(entry) => format!("go run {}", entry),
            None => "go run .".to_string(),
        }),
        ProjectType::Ruby => Some(match entry_file {
            Some(entry) => format!("ruby {}", entry),
            None => "bundle exec rake".to_string(),
        }),
        ProjectType::Java => match profile.package_manager.as_deref() {
            Some("maven") => Some("mvn -q compile exec:java".to_string()),
            _ => Some("gradle run".to_string()),
        },
        ProjectType::Container => {
            Some("docker build -t skill-image . && docker run --rm skill-image".to_string())
        }
        ProjectType::Unknown => None,
    }
}

fn install_command(package_manager: &str) -> Option<&'static str> {
    match package_manager {
        "pip" => Some("python -m venv .venv\nsource .venv/bin/activate\npip install -e ."),
        "pipenv" => Some("pipenv install"),
        "poetry" => Some("poetry install"),
        "uv" => Some("uv sync"),
        "npm" => Some("npm install"),
        "yarn" => Some("yarn install"),
        "pnpm" => Some("pnpm install"),
        "cargo" => Some("cargo build"),
        "go" => Some("go build ./..."),
        "bundler" => Some("bundle install"),
        "maven" => Some("mvn -q package"),
        "gradle" => Some("gradle build"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Wrapper scripts
// ---------------------------------------------------------------------------

fn entrypoint_script(profile: &ProjectProfile, name: &str) -> GeneratedFile {
    let name = slug(name);
    let (ext, content) = match profile.language.as_deref() {
        Some("python") => ("py", entrypoint_python(&name)),
        Some("javascript") => ("js", entrypoint_node(&name)),
        _ => ("sh", entrypoint_shell(&name)),
    };
    GeneratedFile {
        name: format!("entrypoint.{}", ext),
        content,
        executable: true,
    }
}

fn entrypoint_python(name: &str) -> String {
    format!(
        r#"#!/usr/bin/env python3
"""Skill entry point for {name} (wrapper contract v{version}).

Reads input/request.json, writes output/result.json. Work the skill cannot
finish locally is returned as status "pending" with the follow-up action
for the orchestrator to execute and resubmit.
"""

import json
import sys
from pathlib import Path

SKILL_DIR = Path(__file__).resolve().parent.parent
INPUT_FILE = SKILL_DIR / "input" / "request.json"
OUTPUT_FILE = SKILL_DIR / "output" / "result.json"
DEFAULT_RUN_TIMEOUT = {timeout}


def load_request():
    if not INPUT_FILE.exists():
        return {{"command": "help", "args": {{}}, "project_dir": str(SKILL_DIR)}}
    return json.loads(INPUT_FILE.read_text())


def pending(task, label, timeout=DEFAULT_RUN_TIMEOUT):
    return {{
        "status": "pending",
        "action": {{
            "tool": "sessions_spawn",
            "params": {{"task": task, "label": label, "runTimeoutSeconds": timeout}},
        }},
    }}


def main():
    request = load_request()
    command = request.get("command", "help")
    project_dir = request.get("project_dir", str(SKILL_DIR / "vendor"))

    if command == "help":
        result = {{
            "status": "ok",
            "artifacts": [],
            "summary": "{name} skill. Send a command to run it against the project.",
        }}
    else:
        result = pending(
            task=f"Run `{{command}}` for {name} in {{project_dir}}",
            label=f"{name}-{{command}}",
        )

    OUTPUT_FILE.parent.mkdir(parents=True, exist_ok=True)
    OUTPUT_FILE.write_text(json.dumps(result, indent=2))
    sys.exit(0 if result["status"] != "error" else 1)


if __name__ == "__main__":
    main()
"#,
        name = name,
        version = CONTRACT_VERSION,
        timeout = DEFAULT_RUN_TIMEOUT_SECS
    )
}

fn entrypoint_node(name: &str) -> String {
    format!(
        r#"#!/usr/bin/env node
// Skill entry point for {name} (wrapper contract v{version}).
// Reads input/request.json, writes output/result.json.

const fs = require("fs");
const path = require("path");

const SKILL_DIR = path.resolve(__dirname, "..");
const INPUT_FILE = path.join(SKILL_DIR, "input", "request.json");
const OUTPUT_FILE = path.join(SKILL_DIR, "output", "result.json");
const DEFAULT_RUN_TIMEOUT = {timeout};

function loadRequest() {{
  if (!fs.existsSync(INPUT_FILE)) {{
    return {{ command: "help", args: {{}}, project_dir: SKILL_DIR }};
  }}
  return JSON.parse(fs.readFileSync(INPUT_FILE, "utf8"));
}}

function pending(task, label, timeout = DEFAULT_RUN_TIMEOUT) {{
  return {{
    status: "pending",
    action: {{
      tool: "sessions_spawn",
      params: {{ task, label, runTimeoutSeconds: timeout }},
    }},
  }};
}}

const request = loadRequest();
const command = request.command || "help";
const projectDir = request.project_dir || path.join(SKILL_DIR, "vendor");

let result;
if (command === "help") {{
  result = {{
    status: "ok",
    artifacts: [],
    summary: "{name} skill. Send a command to run it against the project.",
  }};
}} else {{
  result = pending(
    `Run \`${{command}}\` for {name} in ${{projectDir}}`,
    `{name}-${{command}}`
  );
}}

fs.mkdirSync(path.dirname(OUTPUT_FILE), {{ recursive: true }});
fs.writeFileSync(OUTPUT_FILE, JSON.stringify(result, null, 2));
process.exit(result.status === "error" ? 1 : 0);
"#,
        name = name,
        version = CONTRACT_VERSION,
        timeout = DEFAULT_RUN_TIMEOUT_SECS
    )
}

fn entrypoint_shell(name: &str) -> String {
    format!(
        r#"#!/usr/bin/env sh
# Skill entry point for {name} (wrapper contract v{version}).
# Reads input/request.json, writes output/result.json.
set -eu

SKILL_DIR=$(CDPATH= cd -- "$(dirname -- "$0")/.." && pwd)
REQUEST="$SKILL_DIR/input/request.json"
RESULT_DIR="$SKILL_DIR/output"
DEFAULT_RUN_TIMEOUT={timeout}

command="help"
if [ -f "$REQUEST" ]; then
    command=$(sed -n 's/.*"command"[[:space:]]*:[[:space:]]*"\([^"]*\)".*/\1/p' "$REQUEST")
    [ -n "$command" ] || command="help"
fi

mkdir -p "$RESULT_DIR"
if [ "$command" = "help" ]; then
    cat > "$RESULT_DIR/result.json" <<EOF
{{"status": "ok", "artifacts": [], "summary": "{name} skill. Send a command to run it against the project."}}
EOF
else
    cat > "$RESULT_DIR/result.json" <<EOF
{{"status": "pending", "action": {{"tool": "sessions_spawn", "params": {{"task": "Run \`$command\` for {name}", "label": "{name}-$command", "runTimeoutSeconds": $DEFAULT_RUN_TIMEOUT}}}}}}
EOF
fi
"#,
        name = name,
        version = CONTRACT_VERSION,
        timeout = DEFAULT_RUN_TIMEOUT_SECS
    )
}

fn init_script(profile: &ProjectProfile, name: &str) -> GeneratedFile {
    let install = profile
        .package_manager
        .as_deref()
        .and_then(install_command)
        .unwrap_or("echo \"No setup required.\"");

    let content = format!(
        r#"#!/usr/bin/env sh
# One-time setup for the {name} skill.
set -eu

SKILL_DIR=$(CDPATH= cd -- "$(dirname -- "$0")/.." && pwd)
PROJECT_DIR="$SKILL_DIR/vendor"
[ -d "$PROJECT_DIR" ] || PROJECT_DIR="$SKILL_DIR"

cd "$PROJECT_DIR"
{install}
"#,
        name = slug(name),
        install = install
    );

    GeneratedFile {
        name: "init.sh".to_string(),
        content,
        executable: true,
    }
}
