use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};
use structopt::StructOpt;
use thiserror::Error;

pub mod fingerprint;
pub mod occurrence;
pub mod report;
pub mod symbol;
pub mod template;

use fingerprint::{is_dated_file_name, loader_tag, Fingerprint, OriginKey};
use occurrence::{Occurrence, OccurrenceIndex};
use report::{ReportWriter, SUMMARY_FILE, SYMBOL_FILE};
use symbol::{extract_symbol, SymbolIndex};
use template::{ClusterConfig, TemplateStore};

#[derive(StructOpt, Debug)]
#[structopt(about = "Cluster recurring log errors into templates and count them per venue and date")]
pub struct Options {
    /// Word, or comma-separated list of words, that marks the lines to extract
    #[structopt(long, default_value = "WARNING,ERROR")]
    pub error_delimiter: String,
    /// Text file listing the log files to process, one per line
    #[structopt(long, default_value = "filelist.txt", parse(from_os_str))]
    pub filelist: PathBuf,
    /// When to write summary rows: cumulative, per-file or final
    #[structopt(long, default_value = "cumulative")]
    pub render: RenderMode,
    /// Directory to write summary.csv and invalid_symbols.csv into
    #[structopt(long, default_value = ".", parse(from_os_str))]
    pub output_dir: PathBuf,
}

/// When the summary table is written, and what each write contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// After every file, everything recorded for the delimiter so far.
    Cumulative,
    /// After every file, only what that file contributed.
    PerFile,
    /// Once per delimiter, after its last file.
    Final,
}

#[derive(Debug, Error)]
#[error("unknown render mode {0:?}, expected cumulative, per-file or final")]
pub struct UnknownRenderMode(String);

impl FromStr for RenderMode {
    type Err = UnknownRenderMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cumulative" => Ok(RenderMode::Cumulative),
            "per-file" => Ok(RenderMode::PerFile),
            "final" => Ok(RenderMode::Final),
            _ => Err(UnknownRenderMode(s.to_owned())),
        }
    }
}

/// The manifest or one of the files it lists could not be opened.
#[derive(Debug, Error)]
#[error("cannot open input file {}", path.display())]
pub struct MissingInput {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| {
        anyhow!(MissingInput {
            path: path.to_owned(),
            source
        })
    })
}

/// Split a comma-separated delimiter list, dropping empty entries.
pub fn parse_delimiters(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|d| !d.is_empty()).map(String::from).collect()
}

/// Read the list of log files, one path per line. Blank lines are skipped.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for line in BufReader::new(open_input(path)?).lines() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let line = line.trim_end();
        if !line.is_empty() {
            files.push(PathBuf::from(line));
        }
    }
    Ok(files)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub lines: usize,
    pub malformed: usize,
    pub occurrences: usize,
    pub templates: usize,
    pub symbols: usize,
    pub summary_rows: usize,
}

#[derive(Debug, Default)]
struct Partition {
    store: TemplateStore,
    occurrences: OccurrenceIndex,
}

/// All state of one run: a template store and occurrence index per delimiter,
/// plus the symbols seen so far.
pub struct Miner {
    config: ClusterConfig,
    partitions: IndexMap<String, Partition>,
    symbols: SymbolIndex,
    stats: RunStats,
}

impl Miner {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            partitions: IndexMap::new(),
            symbols: SymbolIndex::new(),
            stats: RunStats::default(),
        }
    }

    fn partition(&mut self, delimiter: &str) -> &mut Partition {
        let config = self.config;
        self.partitions.entry(delimiter.to_owned()).or_insert_with(|| Partition {
            store: TemplateStore::new(config),
            occurrences: OccurrenceIndex::new(),
        })
    }

    pub fn store(&self, delimiter: &str) -> Option<&TemplateStore> {
        self.partitions.get(delimiter).map(|p| &p.store)
    }

    pub fn occurrences(&self, delimiter: &str) -> Option<&OccurrenceIndex> {
        self.partitions.get(delimiter).map(|p| &p.occurrences)
    }

    pub fn symbols(&self) -> &SymbolIndex {
        &self.symbols
    }

    /// Process every file for every delimiter, writing rows to `report` as `mode` dictates.
    pub fn run<W: Write>(
        &mut self,
        delimiters: &[String],
        files: &[PathBuf],
        mode: RenderMode,
        report: &mut ReportWriter<W>,
    ) -> Result<RunStats> {
        for delimiter in delimiters {
            info!("Extracting {} lines from {} files", delimiter, files.len());
            for file in files {
                if mode == RenderMode::PerFile {
                    self.partition(delimiter).occurrences.clear();
                }
                self.scan_file(delimiter, file, report)?;
                if mode != RenderMode::Final {
                    self.render(delimiter, report)?;
                }
            }
            if mode == RenderMode::Final {
                self.render(delimiter, report)?;
            }
        }
        report.flush()?;
        self.stats.templates = self.partitions.values().map(|p| p.store.len()).sum();
        self.stats.symbols = self.symbols.len();
        Ok(self.stats.clone())
    }

    /// Scan one file for `delimiter`: cluster the lines carrying it and collect
    /// symbols from every line.
    pub fn scan_file<W: Write>(&mut self, delimiter: &str, path: &Path, report: &mut ReportWriter<W>) -> Result<()> {
        let mut reader = BufReader::new(open_input(path)?);
        info!("Scanning {} for {}", path.display(), delimiter);
        if !is_dated_file_name(path) {
            warn!("{} has no date in its name, its loader tag may be wrong", path.display());
        }
        let loader = loader_tag(path);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).with_context(|| format!("failed to read {}", path.display()))? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(&['\n', '\r'][..]);
            self.stats.lines += 1;
            if line.contains(delimiter) {
                self.cluster_line(delimiter, line, loader, path);
            }
            self.collect_symbol(delimiter, line, report)?;
        }
        self.stats.files += 1;
        Ok(())
    }

    fn cluster_line(&mut self, delimiter: &str, line: &str, loader: Option<char>, path: &Path) {
        let window_len = self.config.window_len;
        let fingerprint = match Fingerprint::extract(line, delimiter, window_len) {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                warn!("skipping line ({}): {}", error, line);
                self.stats.malformed += 1;
                return;
            }
        };
        let partition = self.partition(delimiter);
        let id = partition.store.resolve(&fingerprint.window);
        partition.occurrences.record(
            partition.store.get(id),
            &fingerprint.origin,
            Occurrence {
                line: line.to_owned(),
                loader,
                file: path.to_owned(),
            },
        );
        self.stats.occurrences += 1;
    }

    fn collect_symbol<W: Write>(&mut self, delimiter: &str, line: &str, report: &mut ReportWriter<W>) -> Result<()> {
        let symbol = match extract_symbol(line) {
            Some(symbol) => symbol,
            None => return Ok(()),
        };
        let marker = format!("{}:", delimiter);
        let prefix = line.split(marker.as_str()).next().unwrap_or(line);
        let origin = match OriginKey::parse(prefix) {
            Some(origin) => origin,
            None => {
                debug!("no origin for symbol {} in: {}", symbol, line);
                return Ok(());
            }
        };
        if self.symbols.record_if_new(&origin, &symbol) {
            debug!("new symbol {} for {}", symbol, origin);
            report.write_symbol(&symbol, &origin)?;
        }
        Ok(())
    }

    fn render<W: Write>(&mut self, delimiter: &str, report: &mut ReportWriter<W>) -> Result<()> {
        let partition = self.partition(delimiter);
        let rows = report.write_summary(&partition.occurrences, &partition.store)?;
        report.flush()?;
        self.stats.summary_rows += rows;
        Ok(())
    }
}

/// Run the whole extraction described by `options`, creating both output tables
/// in `options.output_dir`.
pub fn run(options: &Options, config: ClusterConfig) -> Result<RunStats> {
    let files = read_manifest(&options.filelist)?;
    let delimiters = parse_delimiters(&options.error_delimiter);
    let create = |name: &str| {
        let path = options.output_dir.join(name);
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))
    };
    let mut report = ReportWriter::new(create(SUMMARY_FILE)?, create(SYMBOL_FILE)?)?;
    Miner::new(config).run(&delimiters, &files, options.render, &mut report)
}
