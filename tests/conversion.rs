//! Integration tests for the conversion contract.
//!
//! Most tests run against a stub converter: a small shell script that speaks
//! enough of Pandoc's command line to exercise the invoker. It reads Markdown
//! from stdin, fails like Pandoc when `--template` or a `--lua-filter` cannot
//! be found, and otherwise writes a `%PDF` artifact to `--output` that echoes
//! its arguments and input, so tests can check what the converter saw.
//!
//! Tests against a real Pandoc + XeLaTeX are gated behind `E2E_ENABLED`:
//!   E2E_ENABLED=1 cargo test --test conversion -- --nocapture

#![cfg(unix)]

use cvpress::{
    convert, convert_to_file, convert_with_config, converter_version, normalize,
    ConversionConfig, CvError, FilterRef, PdfEngine, Session, TemplateChoice, TemplateRef,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ── Test helpers ─────────────────────────────────────────────────────────────

const STUB_PANDOC: &str = r#"#!/bin/sh
out=""
template=""
engine=""
for arg in "$@"; do
  case "$arg" in
    --version) echo "pandoc 3.1.11"; echo "Features: +server +lua"; exit 0 ;;
    --output=*) out="${arg#--output=}" ;;
    --template=*) template="${arg#--template=}" ;;
    --pdf-engine=*) engine="${arg#--pdf-engine=}" ;;
    --lua-filter=*)
      f="${arg#--lua-filter=}"
      if [ ! -f "$f" ]; then
        echo "Could not find file $f" >&2
        exit 83
      fi ;;
  esac
done
if [ ! -f "$template" ]; then
  echo "Could not find data file $template" >&2
  echo "output-was=$out" >&2
  exit 97
fi
{
  printf '%%PDF-1.5\n'
  printf 'engine=%s\n' "$engine"
  printf 'output=%s\n' "$out"
  for arg in "$@"; do printf 'arg=%s\n' "$arg"; done
  printf 'template-body=%s\n' "$(cat "$template")"
  printf 'markdown-begin\n'
  cat
  printf 'markdown-end\n'
  printf '%%%%EOF\n'
} > "$out"
"#;

const STUB_SILENT: &str = "#!/bin/sh\ncat >/dev/null\nexit 0\n";

const STUB_NOT_PDF: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in --output=*) out="${arg#--output=}" ;; esac
done
cat >/dev/null
echo "<html>nope</html>" > "$out"
"#;

const STUB_STDOUT_ERROR: &str = "#!/bin/sh\necho \"pandoc: unknown reader\"\nexit 21\n";

/// Records its pid next to itself, then sleeps in place of the shell.
const STUB_HANG: &str = "#!/bin/sh\necho $$ > \"$(dirname \"$0\")/hang.pid\"\nexec sleep 30\n";

/// Stub scripts are written once per process, before any test spawns a
/// child, so no forked process can still hold them open for writing.
fn stubs() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("cvpress-stubs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create stub dir");
        for (name, body) in [
            ("pandoc", STUB_PANDOC),
            ("silent", STUB_SILENT),
            ("not-pdf", STUB_NOT_PDF),
            ("stdout-error", STUB_STDOUT_ERROR),
            ("hang", STUB_HANG),
        ] {
            let path = dir.join(name);
            std::fs::write(&path, body).expect("write stub");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod stub");
        }
        dir
    })
}

fn config_for(stub: &str) -> ConversionConfig {
    ConversionConfig::builder()
        .pandoc_path(stubs().join(stub))
        .build()
        .expect("valid config")
}

/// A resources dir with a template and two filters.
fn resources() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("templates")).unwrap();
    std::fs::create_dir_all(dir.path().join("filters")).unwrap();
    std::fs::write(dir.path().join("templates/modern.tex"), "MODERN").unwrap();
    std::fs::write(dir.path().join("templates/harvard.tex"), "HARVARD").unwrap();
    std::fs::write(dir.path().join("filters/columns.lua"), "-- columns").unwrap();
    std::fs::write(dir.path().join("filters/inline_dates.lua"), "-- dates").unwrap();
    dir
}

/// Route library logs to the test harness; `RUST_LOG=cvpress=debug` shows
/// the argument vectors.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).into_owned()
}

fn artifact_dir(pdf: &[u8]) -> PathBuf {
    let body = text(pdf);
    let out = body
        .lines()
        .find_map(|l| l.strip_prefix("output="))
        .expect("stub records its output path");
    Path::new(out).parent().expect("output has a parent").to_path_buf()
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_returns_pdf_bytes() {
    init_tracing();
    let res = resources();
    let pdf = convert_with_config(
        "# Jane Doe\n",
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[],
        &config_for("pandoc"),
    )
    .await
    .expect("conversion should succeed");

    assert!(pdf.starts_with(b"%PDF"));
    let body = text(&pdf);
    assert!(body.contains("markdown-begin\n# Jane Doe\nmarkdown-end"));
    assert!(body.contains("engine=xelatex"));
    assert!(body.contains("arg=--from=markdown"));
    assert!(body.contains("arg=--to=pdf"));
    assert!(!body.contains("--lua-filter"));
}

#[tokio::test]
async fn test_filters_passed_in_order() {
    let res = resources();
    let filters = [
        FilterRef::new(res.path().join("filters/inline_dates.lua")),
        FilterRef::new(res.path().join("filters/columns.lua")),
    ];
    let pdf = convert_with_config(
        "text\n",
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &filters,
        &config_for("pandoc"),
    )
    .await
    .unwrap();

    let body = text(&pdf);
    let dates = body.find("inline_dates.lua").expect("dates filter passed");
    let columns = body.find("columns.lua").expect("columns filter passed");
    assert!(dates < columns, "filters must keep caller order");
}

#[tokio::test]
async fn test_engine_from_config() {
    let res = resources();
    let config = ConversionConfig::builder()
        .pandoc_path(stubs().join("pandoc"))
        .pdf_engine(PdfEngine::LuaLaTeX)
        .build()
        .unwrap();
    let pdf = convert_with_config(
        "x\n",
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[],
        &config,
    )
    .await
    .unwrap();
    assert!(text(&pdf).contains("engine=lualatex"));
}

#[tokio::test]
async fn test_inline_template_materialised() {
    let pdf = convert_with_config(
        "x\n",
        TemplateRef::inline("CUSTOM-TEMPLATE"),
        &[],
        &config_for("pandoc"),
    )
    .await
    .unwrap();
    assert!(text(&pdf).contains("template-body=CUSTOM-TEMPLATE"));
}

#[tokio::test]
async fn test_temp_area_removed_after_success() {
    let res = resources();
    let pdf = convert_with_config(
        "x\n",
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[],
        &config_for("pandoc"),
    )
    .await
    .unwrap();
    let dir = artifact_dir(&pdf);
    assert!(!dir.exists(), "temp area {} should be gone", dir.display());
}

// ── Failure path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_template_is_conversion_failed() {
    let err = convert_with_config(
        "# CV\n",
        TemplateRef::path("/no/such/template.tex"),
        &[],
        &config_for("pandoc"),
    )
    .await
    .unwrap_err();

    let diag = err.diagnostic().expect("ConversionFailed carries a diagnostic");
    assert!(diag.starts_with("Could not find data file /no/such/template.tex\n"));

    // Temp area is released on the failure path too.
    let out = diag
        .lines()
        .find_map(|l| l.strip_prefix("output-was="))
        .expect("stub reports its output path");
    assert!(!Path::new(out).parent().unwrap().exists());
}

#[tokio::test]
async fn test_missing_filter_is_conversion_failed() {
    let res = resources();
    let err = convert_with_config(
        "# CV\n",
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[FilterRef::from("/no/such/filter.lua")],
        &config_for("pandoc"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.diagnostic(), Some("Could not find file /no/such/filter.lua\n"));
}

#[tokio::test]
async fn test_success_without_artifact_is_failure() {
    let err = convert_with_config("x", TemplateRef::inline("t"), &[], &config_for("silent"))
        .await
        .unwrap_err();
    assert!(matches!(err, CvError::ConversionFailed { .. }));
}

#[tokio::test]
async fn test_non_pdf_artifact_is_failure() {
    let err = convert_with_config("x", TemplateRef::inline("t"), &[], &config_for("not-pdf"))
        .await
        .unwrap_err();
    assert!(err.diagnostic().unwrap().contains("not a PDF"));
}

#[tokio::test]
async fn test_stdout_diagnostic_when_stderr_empty() {
    let err = convert_with_config("x", TemplateRef::inline("t"), &[], &config_for("stdout-error"))
        .await
        .unwrap_err();
    assert_eq!(err.diagnostic(), Some("pandoc: unknown reader\n"));
}

#[tokio::test]
async fn test_timeout_kills_converter() {
    let config = ConversionConfig::builder()
        .pandoc_path(stubs().join("hang"))
        .timeout_secs(1)
        .build()
        .unwrap();
    let started = std::time::Instant::now();
    let err = convert_with_config("x", TemplateRef::inline("t"), &[], &config)
        .await
        .unwrap_err();
    assert!(matches!(err, CvError::ConversionTimedOut { secs: 1 }));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    // The converter process itself must not outlive the timeout.
    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(stubs().join("hang.pid")).expect("stub wrote its pid");
        let stat = PathBuf::from(format!("/proc/{}/stat", pid.trim()));
        let mut alive = true;
        for _ in 0..50 {
            alive = match std::fs::read_to_string(&stat) {
                // Field 3 is the state; a zombie is already dead.
                Ok(s) => s.rsplit(')').next().and_then(|r| r.split_whitespace().next()) != Some("Z"),
                Err(_) => false,
            };
            if !alive {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        assert!(!alive, "converter pid {} still running", pid.trim());
    }
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_conversions_are_isolated() {
    let res = resources();
    let template = res.path().join("templates/modern.tex");
    let config = config_for("pandoc");

    let (a, b) = tokio::join!(
        convert_with_config("# Alice\n", TemplateRef::path(&template), &[], &config),
        convert_with_config("# Bob\n", TemplateRef::path(&template), &[], &config),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(text(&a).contains("# Alice") && !text(&a).contains("# Bob"));
    assert!(text(&b).contains("# Bob") && !text(&b).contains("# Alice"));
    assert_ne!(artifact_dir(&a), artifact_dir(&b), "temp areas must differ");
}

// ── File-level entry points ─────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_to_file_normalises_and_writes() {
    let res = resources();
    let input = res.path().join("cv.md");
    std::fs::write(&input, "# Jane\nEngineer").unwrap();
    let output = res.path().join("out/nested/cv.pdf");

    let report = convert_to_file(
        &input,
        &output,
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[FilterRef::new(res.path().join("filters/columns.lua"))],
        true,
        &config_for("pandoc"),
    )
    .await
    .unwrap();

    let written = std::fs::read(&output).unwrap();
    assert!(written.starts_with(b"%PDF"));
    assert!(text(&written).contains("markdown-begin\n# Jane\n\nEngineer\nmarkdown-end"));
    assert_eq!(report.pdf_bytes, written.len());
    assert!(report.normalized);
    assert_eq!(report.filters.len(), 1);
    assert!(!output.with_extension("pdf.tmp").exists());
}

#[tokio::test]
async fn test_convert_to_file_without_preprocess() {
    let res = resources();
    let input = res.path().join("cv.md");
    std::fs::write(&input, "# Jane\nEngineer").unwrap();
    let output = res.path().join("cv.pdf");

    convert_to_file(
        &input,
        &output,
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[],
        false,
        &config_for("pandoc"),
    )
    .await
    .unwrap();

    let written = text(&std::fs::read(&output).unwrap());
    assert!(written.contains("markdown-begin\n# Jane\nEngineermarkdown-end"));
}

#[tokio::test]
async fn test_failed_rename_removes_temp_file() {
    let res = resources();
    let input = res.path().join("cv.md");
    std::fs::write(&input, "# Jane").unwrap();
    // A non-empty directory where the PDF should go: the final rename fails.
    let output = res.path().join("cv.pdf");
    std::fs::create_dir_all(output.join("occupied")).unwrap();

    let err = convert_to_file(
        &input,
        &output,
        TemplateRef::path(res.path().join("templates/modern.tex")),
        &[],
        true,
        &config_for("pandoc"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CvError::OutputWriteFailed { .. }), "got: {err:?}");
    assert!(!output.with_extension("pdf.tmp").exists());
    assert!(output.join("occupied").is_dir());
}

#[tokio::test]
async fn test_failed_conversion_leaves_previous_output() {
    let res = resources();
    let input = res.path().join("cv.md");
    std::fs::write(&input, "# Jane").unwrap();
    let output = res.path().join("cv.pdf");
    std::fs::write(&output, b"%PDF-previous").unwrap();

    let err = convert_to_file(
        &input,
        &output,
        TemplateRef::path("/no/such/template.tex"),
        &[],
        true,
        &config_for("pandoc"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CvError::ConversionFailed { .. }));
    assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-previous");
}

#[tokio::test]
async fn test_report_json_serialisable() {
    let res = resources();
    let input = res.path().join("cv.md");
    std::fs::write(&input, "# Jane").unwrap();

    let report = convert_to_file(
        &input,
        res.path().join("cv.pdf"),
        TemplateRef::inline("t"),
        &[],
        true,
        &config_for("pandoc"),
    )
    .await
    .unwrap();

    let json = serde_json::to_value(&report).expect("report serialises");
    assert_eq!(json["pdf_engine"], "xelatex");
    assert_eq!(json["template"], "<inline template, 1 bytes>");
    assert_eq!(json["normalized"], true);
    assert!(json["pdf_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_converter_version_probe() {
    let info = converter_version(&config_for("pandoc")).await.unwrap();
    assert_eq!(info.version, "3.1.11");
    assert_eq!(info.banner, "pandoc 3.1.11");
}

// ── Session ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_generate_and_keep_last_good_pdf() {
    let res = resources();
    let mut session = Session::new("# Jane\nEngineer").with_resources_dir(res.path());
    let config = config_for("pandoc");

    let pdf = session.generate(&config).await.unwrap().to_vec();
    let body = text(&pdf);
    assert!(body.contains("template-body=MODERN"));
    assert!(body.contains("# Jane\n\nEngineer\n"));
    let columns = body.find("columns.lua").unwrap();
    let dates = body.find("inline_dates.lua").unwrap();
    assert!(columns < dates);

    // Break the template: generation fails, previous PDF stays.
    std::fs::remove_file(res.path().join("templates/modern.tex")).unwrap();
    session.set_markdown("# Changed");
    assert!(session.generate(&config).await.is_err());
    assert_eq!(session.last_pdf(), Some(pdf.as_slice()));
}

#[tokio::test]
async fn test_session_custom_template_and_filter_toggle() {
    let res = resources();
    let mut session = Session::new("x").with_resources_dir(res.path());
    session.select_template(TemplateChoice::Harvard);
    session.edit_as_custom().await.unwrap();
    session.filters_mut().columns = false;

    let pdf = session.generate(&config_for("pandoc")).await.unwrap();
    let body = text(pdf);
    assert!(body.contains("template-body=HARVARD"));
    assert!(!body.contains("columns.lua"));
    assert!(body.contains("inline_dates.lua"));
}

// ── Real Pandoc (gated) ──────────────────────────────────────────────────────

const MINIMAL_TEMPLATE: &str = "\\documentclass{article}\n\\begin{document}\n$body$\n\\end{document}\n";

#[tokio::test]
async fn test_real_pandoc_success() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    init_tracing();
    let md = normalize("# Jane Doe\nSoftware engineer\n- Rust\n- Go");
    let pdf = convert(&md, TemplateRef::inline(MINIMAL_TEMPLATE), &[])
        .await
        .expect("pandoc + xelatex should render a minimal document");
    assert!(pdf.starts_with(b"%PDF"));
    println!("✓ {} bytes of PDF", pdf.len());
}

#[tokio::test]
async fn test_real_pandoc_missing_template() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    let err = convert("# CV\n", TemplateRef::path("/definitely/not/a/template.tex"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CvError::ConversionFailed { .. }), "got: {err:?}");
}
