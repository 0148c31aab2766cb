//! Full-pipeline driver: material config in, stacked data files out.
//!
//! Every per-test failure inside a program run is demoted to a logged skip
//! so one bad decoder cannot sink a night of pulls. Only an unavailable
//! database bridge and unreadable material/MTPL inputs abort the run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};

use ctv_clkutils::{index_clkutils, ITUFF_LIMIT};
use ctv_fileio::{delete_files, module_name_from_path, normalize_input_path, path_from_modules};
use ctv_indexer::{index_ctv, IndexMode};
use ctv_mtpl::mtpl_to_csv;
use ctv_query::{uber_request, QueryError, QuerySpec, UberBridge};
use ctv_reshape::{reshape_output, stack_file};
use ctv_smartctv::process_smart_ctv;
use ctv_table::DataTable;

use crate::material::{load_material, MaterialConfig};

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub material_file: PathBuf,
    /// ClkUtils DCM configuration JSON; only consulted for CLKUTILS tests.
    pub clkutils_config: PathBuf,
    /// Root for per-program output folders; defaults to the working
    /// directory's `<program>_script_output`.
    pub output_root: Option<PathBuf>,
    pub delete_intermediates: bool,
    pub stack_outputs: bool,
    /// Frequency corner substituted into derived ClkUtils test names.
    pub corner: String,
}

#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub current: String,
    pub completed: usize,
    pub skipped: usize,
    pub outputs: Vec<PathBuf>,
    pub stacked: Vec<PathBuf>,
}

/// Handle to a driver running on a background worker thread.
pub struct DriverHandle {
    cancel: Arc<AtomicBool>,
    progress: Arc<Mutex<Progress>>,
    worker: JoinHandle<Result<()>>,
}

impl DriverHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Progress {
        self.progress.lock().expect("progress poisoned").clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<()> {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("driver worker panicked")),
        }
    }
}

/// Start the driver on its own thread.
pub fn spawn_run<B>(bridge: B, settings: RunSettings) -> DriverHandle
where
    B: UberBridge + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(Mutex::new(Progress::default()));
    let worker_cancel = Arc::clone(&cancel);
    let worker_progress = Arc::clone(&progress);
    let worker = std::thread::spawn(move || {
        run(&bridge, &settings, &worker_cancel, &worker_progress)
    });
    DriverHandle {
        cancel,
        progress,
        worker,
    }
}

/// Run every program of the material file to completion.
pub fn run(
    bridge: &dyn UberBridge,
    settings: &RunSettings,
    cancel: &AtomicBool,
    progress: &Mutex<Progress>,
) -> Result<()> {
    let material = load_material(&settings.material_file)?;
    for (program, mtpl) in material.program_runs() {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("cancellation requested, stopping before {program}");
            break;
        }
        log::info!("processing program {program}");
        run_program(
            bridge, settings, &material, &program, &mtpl, cancel, progress,
        )?;
    }
    Ok(())
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<QueryError>(),
        Some(QueryError::BridgeUnavailable(_))
    )
}

struct ProgramRun<'a> {
    bridge: &'a dyn UberBridge,
    spec: QuerySpec,
    place_in: PathBuf,
    intermediates: Vec<PathBuf>,
    /// (wide output, tag header names) pairs ready for stacking.
    outputs: Vec<(PathBuf, Vec<String>)>,
}

fn run_program(
    bridge: &dyn UberBridge,
    settings: &RunSettings,
    material: &MaterialConfig,
    program: &str,
    mtpl: &str,
    cancel: &AtomicBool,
    progress: &Mutex<Progress>,
) -> Result<()> {
    let place_in = match &settings.output_root {
        Some(root) => root.join(format!("{program}_output")),
        None => std::env::current_dir()?.join(format!("{program}_script_output")),
    };
    std::fs::create_dir_all(&place_in)
        .with_context(|| format!("could not create {}", place_in.display()))?;

    let mut run = ProgramRun {
        bridge,
        spec: QuerySpec {
            lot: material.lots.clone(),
            wafer_id: material.wafers.clone(),
            program: program.to_string(),
            prefetch: material.prefetch,
            databases: material.databases.clone(),
        },
        place_in,
        intermediates: Vec::new(),
        outputs: Vec::new(),
    };

    for test in &material.tests {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if !test.to_uppercase().contains("CLKUTILS") {
            continue;
        }
        note_current(progress, test);
        match run_clkutils_test(&mut run, settings, test) {
            Ok(()) => note_done(progress, &run),
            Err(err) if is_fatal(&err) => return Err(err),
            Err(err) => {
                log::warn!("skipping {test}: {err:#}");
                note_skip(progress);
            }
        }
    }

    if mtpl.trim().is_empty() {
        finish_program(&mut run, settings, progress)?;
        return Ok(());
    }

    let mtpl_path = PathBuf::from(normalize_input_path(mtpl));
    let mtpl_csv = mtpl_to_csv(&mtpl_path, &run.place_in)
        .with_context(|| format!("could not parse MTPL {}", mtpl_path.display()))?;
    let mtpl_table = DataTable::read_csv(&mtpl_csv)?;
    run.intermediates.push(mtpl_csv);
    let base_dir = mtpl
        .split("Modules")
        .next()
        .unwrap_or("")
        .trim_end_matches(['\\', '/'])
        .to_string();

    for test in &material.tests {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("cancellation requested, stopping {program}");
            break;
        }
        if test.to_uppercase().contains("CLKUTILS") {
            continue;
        }
        note_current(progress, test);
        match run_mtpl_test(&mut run, &mtpl_table, Path::new(&base_dir), test) {
            Ok(()) => note_done(progress, &run),
            Err(err) if is_fatal(&err) => return Err(err),
            Err(err) => {
                log::warn!("skipping {test}: {err:#}");
                note_skip(progress);
            }
        }
    }

    finish_program(&mut run, settings, progress)
}

fn note_current(progress: &Mutex<Progress>, test: &str) {
    let mut p = progress.lock().expect("progress poisoned");
    p.current = test.to_string();
    log::info!("{test} is running");
}

fn note_done(progress: &Mutex<Progress>, run: &ProgramRun) {
    let mut p = progress.lock().expect("progress poisoned");
    p.completed += 1;
    p.outputs = run.outputs.iter().map(|(path, _)| path.clone()).collect();
}

fn note_skip(progress: &Mutex<Progress>) {
    progress.lock().expect("progress poisoned").skipped += 1;
}

fn run_clkutils_test(run: &mut ProgramRun, settings: &RunSettings, test: &str) -> Result<()> {
    let index = index_clkutils(
        &settings.clkutils_config,
        Some(test),
        Some(&run.place_in),
        ITUFF_LIMIT,
        &settings.corner,
    )?;
    let tag_headers = index
        .tag_headers
        .ok_or_else(|| anyhow!("{test} selects multiple die regions, cannot continue"))?;
    let indexed_file = index
        .out_files
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no indexed file produced for {test}"))?;
    run.intermediates.push(indexed_file.clone());

    let pulled = uber_request(
        run.bridge,
        &indexed_file,
        test,
        "ClkUtils",
        false,
        Some(&run.place_in),
        &run.spec,
    )?;
    run.intermediates.push(pulled.pulled_file.clone());

    let out = reshape_output(
        &pulled.pulled_file,
        &indexed_file,
        test,
        "",
        Some(&run.place_in),
    )?;
    run.outputs.push((out, tag_headers));
    Ok(())
}

fn run_mtpl_test(
    run: &mut ProgramRun,
    mtpl_table: &DataTable,
    base_dir: &Path,
    test: &str,
) -> Result<()> {
    let test_match = test.rsplit("::").next().unwrap_or(test);
    let type_idx = mtpl_table.require_column("TestType")?;
    let name_idx = mtpl_table.require_column("TestName")?;
    let config_idx = mtpl_table.require_column("ConfigurationFile")?;
    let basic_idx = mtpl_table.require_column("BasicTestConfiguration")?;
    let mode_idx = mtpl_table.require_column("Mode")?;

    let row = mtpl_table
        .rows()
        .iter()
        .find(|row| row[name_idx] == test_match)
        .ok_or_else(|| anyhow!("no MTPL entry for {test_match}"))?;

    let test_type = row[type_idx].as_str();
    let config_raw = row[config_idx].trim_matches('"');
    let config_rel = path_from_modules(config_raw)
        .ok_or_else(|| anyhow!("configuration path out of scope: {config_raw}"))?;
    let config_rel = normalize_input_path(config_rel);
    let module_name = module_name_from_path(&config_rel).unwrap_or_default();
    let test_file = base_dir.join(&config_rel);
    if !test_file.exists() {
        return Err(anyhow!("configuration file not found: {}", test_file.display()));
    }

    match test_type {
        "CtvDecoderSpm" => {
            let indexed = index_ctv(
                &test_file,
                test,
                &module_name,
                &run.place_in,
                IndexMode::Standard,
                "",
            )?;
            run.intermediates.push(indexed.out_file.clone());
            query_and_reshape(run, &indexed.out_file, test_match, test_type, &indexed)?;
        }
        "SmartCtvDc" => {
            let mode = row[mode_idx].trim_matches(['"', '\''].as_ref());
            if mode.to_lowercase().contains("ctvtag") {
                let expansions =
                    process_smart_ctv(base_dir, &test_file, None, &run.place_in)?;
                for expansion in expansions {
                    run.intermediates.push(expansion.out_file.clone());
                    let indexed = index_ctv(
                        &expansion.out_file,
                        test_match,
                        &module_name,
                        &run.place_in,
                        IndexMode::CtvTag,
                        &expansion.config_id,
                    )?;
                    run.intermediates.push(indexed.out_file.clone());
                    let suffixed = format!("{test_match}{}", expansion.ituff_suffix);
                    query_and_reshape(run, &indexed.out_file, &suffixed, test_type, &indexed)?;
                }
            } else {
                let config_id = row[basic_idx]
                    .trim()
                    .parse::<f64>()
                    .map(|n| (n as i64).to_string())
                    .map_err(|_| {
                        anyhow!("bad BasicTestConfiguration '{}' for {test}", row[basic_idx])
                    })?;
                let expansion = process_smart_ctv(
                    base_dir,
                    &test_file,
                    Some(&config_id),
                    &run.place_in,
                )?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("config {config_id} produced no expansion"))?;
                run.intermediates.push(expansion.out_file.clone());
                let indexed = index_ctv(
                    &expansion.out_file,
                    test_match,
                    &module_name,
                    &run.place_in,
                    IndexMode::Standard,
                    "",
                )?;
                run.intermediates.push(indexed.out_file.clone());
                query_and_reshape(run, &indexed.out_file, test_match, test_type, &indexed)?;
            }
        }
        other => return Err(anyhow!("unsupported test type '{other}' for {test}")),
    }
    Ok(())
}

fn query_and_reshape(
    run: &mut ProgramRun,
    indexed_file: &Path,
    test_name: &str,
    test_type: &str,
    indexed: &ctv_indexer::IndexedCtv,
) -> Result<()> {
    let pulled = uber_request(
        run.bridge,
        indexed_file,
        test_name,
        test_type,
        true,
        Some(&run.place_in),
        &run.spec,
    )?;
    run.intermediates.push(pulled.pulled_file.clone());

    let out = reshape_output(
        &pulled.pulled_file,
        indexed_file,
        test_name,
        &indexed.csv_identifier,
        Some(&run.place_in),
    )?;
    run.outputs.push((out, indexed.tag_headers.clone()));
    Ok(())
}

fn finish_program(
    run: &mut ProgramRun,
    settings: &RunSettings,
    progress: &Mutex<Progress>,
) -> Result<()> {
    if settings.delete_intermediates {
        delete_files(run.intermediates.drain(..));
    }
    if settings.stack_outputs {
        let mut stacked_paths = Vec::new();
        for (output, tag_headers) in &run.outputs {
            match stack_file(output, tag_headers) {
                Ok(stacked) => stacked_paths.push(stacked),
                Err(err) => log::warn!("could not stack {}: {err}", output.display()),
            }
        }
        if settings.delete_intermediates {
            delete_files(run.outputs.drain(..).map(|(path, _)| path));
        }
        let mut p = progress.lock().expect("progress poisoned");
        p.stacked.extend(stacked_paths);
    }
    Ok(())
}
