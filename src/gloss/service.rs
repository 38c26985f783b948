//! GlossService facade for orchestrating gloss operations.
//!
//! This module provides the main entry point for glossing a unit of a
//! play. The `GlossService` orchestrates the structural parser, the
//! cache, the backend, and the document renderer.
//!
//! # Workflow
//!
//! 1. Read the play text
//! 2. Resolve the requested unit to a line range
//! 3. Build the character registry and segment speeches
//! 4. Assemble chunks under the merge threshold
//! 5. Per chunk: cache lookup, else generate with retry and persist
//! 6. Render the ordered document and write it out

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::{BackendKind, GlossBackend};
use super::chunk::{assemble, SpeechChunk};
use super::document::{output_filename, render, GlossedChunk};
use super::error::GlossError;
use super::prompt::{build_gloss_prompt, clean_gloss, ensure_speaker_heading};
use super::retry::{with_retry, RetryPolicy};
use super::GLOSS_KIND;
use crate::parser::registry::CharacterRegistry;
use crate::parser::{detect, locate, segment, ParseError, PlayFormat, UnitRef};
use crate::store::{GlossStore, PassageRecord, SqliteStore};

/// Default timeout for agent invocations in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default merge threshold in source lines.
pub const DEFAULT_MERGE_THRESHOLD: i64 = 42;

/// Configuration options for a gloss run.
#[derive(Debug, Clone)]
pub struct GlossOptions {
    /// Backend to use for generation
    pub backend: BackendKind,
    /// Play title for prompts and cache rows (None = derive from filename)
    pub play_title: Option<String>,
    /// Merge threshold in lines; <= 0 disables merging
    pub merge_threshold: i64,
    /// Timeout per chunk in seconds
    pub timeout_secs: u64,
    /// Retry schedule for backend failures
    pub retry: RetryPolicy,
    /// Plan the run without calling the backend
    pub dry_run: bool,
    /// Quiet mode (suppress progress output)
    pub quiet: bool,
    /// Directory for the rendered document
    pub output_dir: PathBuf,
    /// Cache database path
    pub db_path: PathBuf,
}

impl Default for GlossOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Claude,
            play_title: None,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            dry_run: false,
            quiet: false,
            output_dir: PathBuf::from("."),
            db_path: PathBuf::from("playgloss.db"),
        }
    }
}

impl GlossOptions {
    /// Create options for a specific backend.
    pub fn with_backend(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Set the play title used in prompts and the cache.
    pub fn play_title(mut self, title: String) -> Self {
        self.play_title = Some(title);
        self
    }

    /// Set the merge threshold.
    pub fn merge_threshold(mut self, lines: i64) -> Self {
        self.merge_threshold = lines;
        self
    }

    /// Set timeout per chunk.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry schedule.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enable quiet mode.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set the cache database path.
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.db_path = path;
        self
    }
}

/// Result of a gloss run.
#[derive(Debug)]
pub struct GlossReport {
    /// The unit that was glossed
    pub unit: UnitRef,
    /// Detected markup convention of the source
    pub format: PlayFormat,
    /// Total chunks in the unit
    pub chunks_total: usize,
    /// Chunks answered from the cache
    pub cached: usize,
    /// Chunks generated by the backend this run
    pub generated: usize,
    /// Where the document was written (None on dry run)
    pub document_path: Option<PathBuf>,
    /// True when scene bounds were inferred rather than located
    pub inferred_bounds: bool,
}

impl GlossReport {
    /// True when every chunk came from the cache.
    pub fn fully_cached(&self) -> bool {
        self.generated == 0 && self.chunks_total > 0
    }
}

/// Main service for glossing play units.
///
/// Facade pattern - coordinates parser, cache, backend, and renderer.
pub struct GlossService {
    options: GlossOptions,
    backend: Box<dyn GlossBackend>,
    store: Box<dyn GlossStore>,
    interrupt: Arc<AtomicBool>,
    sleeper: Box<dyn Fn(Duration)>,
}

impl GlossService {
    /// Create a new service, opening the cache at the configured path.
    pub fn new(options: GlossOptions) -> Result<Self, GlossError> {
        let store = SqliteStore::open(&options.db_path).map_err(|e| GlossError::IoError {
            operation: "opening gloss cache".to_string(),
            message: e.to_string(),
        })?;
        let backend = options.backend.create_backend();
        Ok(Self::assemble_service(options, backend, Box::new(store)))
    }

    /// Create with a custom backend and store (for testing).
    pub fn with_parts(
        options: GlossOptions,
        backend: Box<dyn GlossBackend>,
        store: Box<dyn GlossStore>,
    ) -> Self {
        Self::assemble_service(options, backend, store)
    }

    fn assemble_service(
        options: GlossOptions,
        backend: Box<dyn GlossBackend>,
        store: Box<dyn GlossStore>,
    ) -> Self {
        Self {
            options,
            backend,
            store,
            interrupt: Arc::new(AtomicBool::new(false)),
            sleeper: Box::new(|d| std::thread::sleep(d)),
        }
    }

    /// Replace the retry sleep function (for testing).
    pub fn with_sleeper(mut self, sleeper: Box<dyn Fn(Duration)>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Flag checked between chunks; set it from a Ctrl-C handler.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Check if the configured backend is available.
    pub fn is_backend_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Gloss one unit of the play at `path`.
    pub fn run<P: AsRef<Path>>(&self, path: P, unit_str: &str) -> Result<GlossReport, GlossError> {
        let path = path.as_ref();
        let unit = UnitRef::parse(unit_str)?;

        let text = std::fs::read_to_string(path).map_err(|e| GlossError::IoError {
            operation: "reading play text".to_string(),
            message: e.to_string(),
        })?;
        let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

        let format = detect(&lines);
        let registry = CharacterRegistry::build(&lines);
        let play_title = self.play_title(path);

        let bounds = self.resolve_bounds(&lines, &unit, format)?;
        if bounds.is_inferred() && !self.options.quiet {
            eprintln!(
                "Warning: {} has no scene markers; boundaries were inferred from stage directions and may be off.",
                unit.describe_both()
            );
        }

        let speeches = segment::segment(&lines, bounds.range(), &registry);
        if speeches.is_empty() {
            return Err(GlossError::NoSpeeches {
                unit: unit.describe_both(),
            });
        }

        let chunks = assemble(speeches, self.options.merge_threshold);
        let chunks_total = chunks.len();

        if self.options.dry_run {
            self.print_plan(&unit, format, &chunks);
            return Ok(GlossReport {
                unit,
                format,
                chunks_total,
                cached: 0,
                generated: 0,
                document_path: None,
                inferred_bounds: bounds.is_inferred(),
            });
        }

        let unit_label = unit.describe_both();
        let mut entries: Vec<GlossedChunk> = Vec::with_capacity(chunks_total);
        let mut cached = 0usize;
        let mut generated = 0usize;

        for (i, chunk) in chunks.into_iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                return Err(GlossError::Interrupted {
                    completed: i,
                    total: chunks_total,
                });
            }

            match self.cached_gloss(&chunk) {
                Some(content) => {
                    cached += 1;
                    if !self.options.quiet {
                        eprintln!(
                            "[{}/{}] {} (cached)",
                            i + 1,
                            chunks_total,
                            chunk.speaker_summary()
                        );
                    }
                    entries.push(GlossedChunk {
                        chunk,
                        gloss: content,
                        from_cache: true,
                    });
                }
                None => {
                    if !self.options.quiet {
                        eprintln!(
                            "[{}/{}] {} (generating via {})",
                            i + 1,
                            chunks_total,
                            chunk.speaker_summary(),
                            self.backend.name()
                        );
                    }
                    let gloss = self.generate_gloss(&chunk, &play_title, &unit_label)?;
                    self.persist(&play_title, &unit, &chunk, &gloss)?;
                    generated += 1;
                    entries.push(GlossedChunk {
                        chunk,
                        gloss,
                        from_cache: false,
                    });
                }
            }
        }

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let document = render(&play_title, &unit, &source_name, &entries);

        std::fs::create_dir_all(&self.options.output_dir).map_err(|e| GlossError::IoError {
            operation: "creating output directory".to_string(),
            message: e.to_string(),
        })?;
        let doc_path = self.options.output_dir.join(output_filename(&unit));
        std::fs::write(&doc_path, document).map_err(|e| GlossError::IoError {
            operation: "writing gloss document".to_string(),
            message: e.to_string(),
        })?;

        Ok(GlossReport {
            unit,
            format,
            chunks_total,
            cached,
            generated,
            document_path: Some(doc_path),
            inferred_bounds: bounds.is_inferred(),
        })
    }

    /// Marker-based location, with inference as the fallback for
    /// minimally marked folio texts.
    fn resolve_bounds(
        &self,
        lines: &[String],
        unit: &UnitRef,
        format: PlayFormat,
    ) -> Result<crate::parser::SceneBounds, GlossError> {
        match locate::locate(lines, unit) {
            Ok(bounds) => Ok(bounds),
            Err(ParseError::UnitNotFound(_))
                if format == PlayFormat::FolioMinimal && !unit.is_prologue() && !unit.is_epilogue() =>
            {
                Ok(locate::infer_scene(lines, unit)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cache lookup; a read failure degrades to a miss with a warning.
    fn cached_gloss(&self, chunk: &SpeechChunk) -> Option<String> {
        match self.store.get(&chunk.hash, GLOSS_KIND) {
            Ok(hit) => hit.map(|c| c.content),
            Err(e) => {
                eprintln!(
                    "Warning: cache lookup failed for chunk {}: {}. Regenerating.",
                    chunk.hash_prefix(),
                    e
                );
                None
            }
        }
    }

    fn generate_gloss(
        &self,
        chunk: &SpeechChunk,
        play_title: &str,
        unit_label: &str,
    ) -> Result<String, GlossError> {
        let prompt = build_gloss_prompt(chunk, play_title, unit_label);
        let timeout = Duration::from_secs(self.options.timeout_secs);

        let raw = with_retry(
            self.options.retry,
            || self.backend.generate(&prompt, timeout),
            |d| (self.sleeper)(d),
        )
        .map_err(|exhausted| {
            GlossError::from_backend_error(
                chunk.hash_prefix(),
                &chunk.speaker_summary(),
                exhausted.attempts,
                &exhausted.last_error,
            )
        })?;

        let gloss = clean_gloss(&raw);
        if let [only] = chunk.speeches.as_slice() {
            return Ok(ensure_speaker_heading(&gloss, &only.speaker));
        }
        Ok(gloss)
    }

    /// Persist a fresh gloss. A write failure is fatal; losing it would
    /// re-bill the chunk on the next run.
    fn persist(
        &self,
        play_title: &str,
        unit: &UnitRef,
        chunk: &SpeechChunk,
        gloss: &str,
    ) -> Result<(), GlossError> {
        let record = PassageRecord {
            play: play_title.to_string(),
            act: unit.act,
            scene: unit.scene,
            hash: chunk.hash.clone(),
            speakers: chunk.speaker_summary(),
        };
        self.store
            .put(&record, GLOSS_KIND, gloss)
            .map(|_| ())
            .map_err(|e| GlossError::CacheWrite {
                message: e.to_string(),
            })
    }

    /// Play title from options, or derived from the source filename.
    fn play_title(&self, path: &Path) -> String {
        if let Some(title) = &self.options.play_title {
            return title.clone();
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        title_case(&stem)
    }

    fn print_plan(&self, unit: &UnitRef, format: PlayFormat, chunks: &[SpeechChunk]) {
        println!(
            "{}: {} chunk(s) at threshold {} ({} format)",
            unit.describe_both(),
            chunks.len(),
            self.options.merge_threshold,
            format
        );
        for (i, chunk) in chunks.iter().enumerate() {
            let cached = self.cached_gloss(chunk).is_some();
            println!(
                "  {}. {} [{} lines, {}] {}",
                i + 1,
                chunk.speaker_summary(),
                chunk.line_count,
                chunk.hash_prefix(),
                if cached { "cached" } else { "to generate" }
            );
        }
    }
}

/// "romeo_and_juliet" -> "Romeo And Juliet".
fn title_case(stem: &str) -> String {
    stem.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;
    use crate::store::SqliteStore;
    use std::io::Write;
    use std::sync::Mutex;

    fn play_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("hamlet.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "DRAMATIS PERSONAE\n\
             \n\
             HAMLET, Prince of Denmark\n\
             OPHELIA, daughter to Polonius\n\
             \n\
             \n\
             ACT III\n\
             SCENE I. A room in the castle.\n\
             HAMLET.\n\
             To be, or not to be.\n\
             OPHELIA.\n\
             Good my lord.\n\
             SCENE II. The hall.\n\
             HAMLET.\n\
             Speak the speech, I pray you."
        )
        .unwrap();
        path
    }

    fn options(dir: &tempfile::TempDir) -> GlossOptions {
        GlossOptions::default()
            .merge_threshold(0)
            .output_dir(dir.path().join("out"))
            .quiet()
    }

    fn service(dir: &tempfile::TempDir, backend: MockBackend) -> GlossService {
        GlossService::with_parts(
            options(dir),
            Box::new(backend),
            Box::new(SqliteStore::open_in_memory().unwrap()),
        )
    }

    #[test]
    fn run_generates_and_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let svc = service(&dir, MockBackend::always("A gloss."));

        let report = svc.run(&path, "Act 3, Scene 1").unwrap();

        assert_eq!(report.chunks_total, 2);
        assert_eq!(report.generated, 2);
        assert_eq!(report.cached, 0);
        assert!(!report.inferred_bounds);

        let doc_path = report.document_path.unwrap();
        assert!(doc_path.ends_with("act3_scene1_line-by-line.md"));
        let doc = std::fs::read_to_string(doc_path).unwrap();
        assert!(doc.contains("# Hamlet: Act 3 (III), Scene 1 (I)"));
        assert!(doc.contains("To be, or not to be."));
        assert!(doc.contains("A gloss."));
    }

    #[test]
    fn second_run_is_fully_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let store = Box::new(SqliteStore::open_in_memory().unwrap());

        // Shared store across two services is simulated by reusing one
        // service; the backend call count distinguishes the two runs.
        let svc = GlossService::with_parts(
            options(&dir),
            Box::new(MockBackend::always("A gloss.")),
            store,
        );

        let first = svc.run(&path, "Act 3, Scene 1").unwrap();
        assert_eq!(first.generated, 2);

        let second = svc.run(&path, "Act 3, Scene 1").unwrap();
        assert_eq!(second.generated, 0);
        assert_eq!(second.cached, 2);
        assert!(second.fully_cached());
    }

    #[test]
    fn dry_run_calls_no_backend_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let backend = MockBackend::always("A gloss.");
        let svc = GlossService::with_parts(
            options(&dir).dry_run(true),
            Box::new(backend),
            Box::new(SqliteStore::open_in_memory().unwrap()),
        );

        let report = svc.run(&path, "Act 3, Scene 1").unwrap();
        assert!(report.document_path.is_none());
        assert_eq!(report.generated, 0);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_unit_errors_with_both_numberings() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let svc = service(&dir, MockBackend::always("A gloss."));

        let err = svc.run(&path, "Act 5, Scene 9").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Act 5 (V)"));
        assert!(msg.contains("Scene 9 (IX)"));
    }

    #[test]
    fn retry_then_success_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let backend = MockBackend::new(vec![
            Err(crate::gloss::backend::BackendError::Timeout(
                Duration::from_secs(1),
            )),
            Err(crate::gloss::backend::BackendError::Timeout(
                Duration::from_secs(1),
            )),
            Ok("Recovered gloss.".to_string()),
        ]);

        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sleeps);
        let svc = GlossService::with_parts(
            options(&dir)
                .merge_threshold(100) // one chunk
                .retry(RetryPolicy::new(3, Duration::from_secs(2))),
            Box::new(backend),
            Box::new(SqliteStore::open_in_memory().unwrap()),
        )
        .with_sleeper(Box::new(move |d| recorded.lock().unwrap().push(d)));

        let report = svc.run(&path, "Act 3, Scene 1").unwrap();
        assert_eq!(report.generated, 1);
        assert_eq!(
            *sleeps.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn exhausted_retries_surface_chunk_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let backend = MockBackend::new(vec![Err(
            crate::gloss::backend::BackendError::Timeout(Duration::from_secs(1)),
        )]);

        let svc = GlossService::with_parts(
            options(&dir)
                .merge_threshold(100)
                .retry(RetryPolicy::new(1, Duration::from_secs(1))),
            Box::new(backend),
            Box::new(SqliteStore::open_in_memory().unwrap()),
        )
        .with_sleeper(Box::new(|_| {}));

        let err = svc.run(&path, "Act 3, Scene 1").unwrap_err();
        match err {
            GlossError::ChunkExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("Expected ChunkExhausted, got {}", other),
        }
    }

    #[test]
    fn interrupt_before_first_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = play_file(&dir);
        let svc = service(&dir, MockBackend::always("A gloss."));
        svc.interrupt_flag().store(true, Ordering::SeqCst);

        let err = svc.run(&path, "Act 3, Scene 1").unwrap_err();
        assert!(matches!(err, GlossError::Interrupted { completed: 0, .. }));
    }

    #[test]
    fn title_case_from_filename() {
        assert_eq!(title_case("romeo_and_juliet"), "Romeo And Juliet");
        assert_eq!(title_case("hamlet"), "Hamlet");
        assert_eq!(title_case("twelfth-night"), "Twelfth Night");
    }
}
