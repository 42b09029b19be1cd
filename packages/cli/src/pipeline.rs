//! Stage orchestration for the `flood_events` binary.
//!
//! Each subcommand reads its inputs from the configured paths, runs one
//! library stage and writes its table. `run` chains all three stages in
//! memory and checks every input before the first stage starts.

use std::error::Error;

use flood_events_cli_utils::{IndicatifProgress, MultiProgress};
use flood_events_config::PipelineConfig;
use flood_events_event_models::{DisaggregatedRecord, FlaggedRecord, SourceEvent};
use flood_events_io as io;

type PipelineResult<T> = Result<T, Box<dyn Error>>;

/// Registry + hierarchy -> disaggregated dataset.
pub fn disaggregate(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> PipelineResult<Vec<DisaggregatedRecord>> {
    let paths = &config.paths;
    io::ensure_inputs_exist([paths.registry.as_path(), paths.region_hierarchy.as_path()])?;

    let registry = io::load_registry(&paths.registry)?;
    disaggregate_events(&registry, config, multi)
}

fn disaggregate_events(
    registry: &[SourceEvent],
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> PipelineResult<Vec<DisaggregatedRecord>> {
    let paths = &config.paths;
    let hierarchy = io::load_hierarchy(&paths.region_hierarchy)?;

    let progress = IndicatifProgress::stage_bar(multi, "Disaggregating events");
    let (records, _) = flood_events_disaggregate::disaggregate(
        registry,
        &hierarchy,
        &config.damage,
        &progress,
    )?;

    io::save(&paths.disaggregated, &records)?;
    Ok(records)
}

/// Registry + disaggregated dataset + metrics -> final flagged dataset.
pub fn postprocess(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> PipelineResult<Vec<FlaggedRecord>> {
    let paths = &config.paths;
    io::ensure_inputs_exist([
        paths.registry.as_path(),
        paths.disaggregated.as_path(),
        paths.metrics.as_path(),
    ])?;

    let registry = io::load_registry(&paths.registry)?;
    let disaggregated = io::load_disaggregated(&paths.disaggregated)?;
    postprocess_records(&registry, &disaggregated, config, multi)
}

fn postprocess_records(
    registry: &[SourceEvent],
    disaggregated: &[DisaggregatedRecord],
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> PipelineResult<Vec<FlaggedRecord>> {
    let paths = &config.paths;
    let metrics = io::load_metrics(&paths.metrics)?;

    let progress = IndicatifProgress::stage_bar(multi, "Flagging records");
    let (records, stats) = flood_events_postprocess::postprocess(
        registry,
        disaggregated,
        &metrics,
        config,
        &progress,
    )?;
    log::info!(
        "Final dataset: {} rows ({} reinserted lost events)",
        records.len(),
        stats.lost_events
    );

    io::save(&paths.output, &records)?;
    Ok(records)
}

/// Final dataset -> per-region summary.
pub fn summarize(config: &PipelineConfig) -> PipelineResult<()> {
    let paths = &config.paths;
    io::ensure_inputs_exist([paths.output.as_path()])?;

    let records = io::load_final(&paths.output)?;
    summarize_records(&records, config)
}

fn summarize_records(records: &[FlaggedRecord], config: &PipelineConfig) -> PipelineResult<()> {
    let summary = flood_events_postprocess::summarize_regions(records);
    log::info!("Summarized {} regions", summary.len());
    io::save_summary(&config.paths.summary, &summary)?;
    Ok(())
}

/// Runs every stage, failing before any work if an input is missing.
pub fn run(config: &PipelineConfig, multi: &MultiProgress) -> PipelineResult<()> {
    let paths = &config.paths;
    io::ensure_inputs_exist([
        paths.registry.as_path(),
        paths.region_hierarchy.as_path(),
        paths.metrics.as_path(),
    ])?;

    let registry = io::load_registry(&paths.registry)?;
    let disaggregated = disaggregate_events(&registry, config, multi)?;
    let records = postprocess_records(&registry, &disaggregated, config, multi)?;
    summarize_records(&records, config)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths.registry = dir.join("registry.csv");
        config.paths.region_hierarchy = dir.join("hierarchy.csv");
        config.paths.disaggregated = dir.join("out/disaggregated.csv");
        config.paths.metrics = dir.join("metrics.csv");
        config.paths.output = dir.join("out/final.csv");
        config.paths.summary = dir.join("out/summary.csv");
        config
    }

    fn write_inputs(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("registry.csv"),
            "id,disaster_type,disaster_subtype,iso,country,start_year,start_month,start_day,\
             end_year,end_month,end_day,admin_units,total_damage,processing_notes\n\
             E1,Flood,Riverine flood,SRB,Serbia,2019,3,15,2019,5,2,\
             \"[{\"\"adm2_code\"\":101},{\"\"adm2_code\"\":102}]\",100,\n\
             E3,Flood,,SRB,Serbia,,,,2019,5,,\"[{\"\"adm2_code\"\":101}]\",,\n\
             E2,Flood,,SRB,Serbia,2019.0,6.0,nan,2019.0,6.0,nan,\
             \"[{'adm2_code': 201}]\",,7\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("hierarchy.csv"),
            "adm2_code,adm1_code,adm1_name\n101,25381,North\n102,25381,North\n201,2,South\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("metrics.csv"),
            "composite_id,flooded_population,flooded_area,flooded_area_norm,\
             metrics_error,processing_notes\n\
             2019-03-E1-R,0,0,0,,\n\
             2019-03-E1-25381,500,2.5,0.1,,\n\
             2019-04-E1-25381,300,1.5,0.05,,\n\
             2019-06-E2-2,0,0,0,,7\n",
        )
        .unwrap();
    }

    #[test]
    fn run_writes_every_table() {
        let dir = std::env::temp_dir().join("flood_events_pipeline_run_test");
        let _ = std::fs::remove_dir_all(&dir);
        write_inputs(&dir);
        let config = config_in(&dir);

        run(&config, &hidden()).unwrap();

        let disaggregated = io::load_disaggregated(&config.paths.disaggregated).unwrap();
        let ids: Vec<&str> = disaggregated
            .iter()
            .filter_map(|r| r.composite_id.as_deref())
            .collect();
        assert_eq!(
            ids,
            vec![
                "2019-03-E1-25381",
                "2019-04-E1-25381",
                "2019-05-E1-25381",
                "2019-06-E2-2",
            ]
        );

        let records = io::load_final(&config.paths.output).unwrap();
        let rows: Vec<(&str, Option<&str>, String)> = records
            .iter()
            .map(|r| (r.id.as_str(), r.composite_id.as_deref(), r.flags.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("E1", Some("2019-03-E1-25381"), String::new()),
                ("E1", Some("2019-04-E1-25381"), String::new()),
                ("E1", Some("2019-05-E1-25381"), String::new()),
                ("E3", None, "9".to_string()),
                ("E2", Some("2019-06-E2-2"), "1; 2; 7; 12".to_string()),
            ]
        );
        assert_eq!(records[0].country.as_deref(), Some("Serbia"));
        assert_eq!(records[0].event_duration_days, Some(17));
        assert_eq!(records[2].flooded_area, None);
        assert_eq!(records[4].event_duration_days, Some(30));

        let summary = std::fs::read_to_string(&config.paths.summary).unwrap();
        let mut lines = summary.lines();
        assert_eq!(
            lines.next(),
            Some(
                "region1_code,event_count,mean_flooded_population,mean_flooded_area,\
                 mean_flooded_area_norm"
            )
        );
        assert!(lines.next().unwrap().starts_with("25381,3,400.0,2.0,"));
        assert_eq!(lines.next(), Some("2,1,,,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn run_fails_before_writing_when_metrics_missing() {
        let dir = std::env::temp_dir().join("flood_events_pipeline_missing_test");
        let _ = std::fs::remove_dir_all(&dir);
        write_inputs(&dir);
        std::fs::remove_file(dir.join("metrics.csv")).unwrap();
        let config = config_in(&dir);

        let err = run(&config, &hidden()).unwrap_err();
        assert!(err.to_string().contains("metrics.csv"));
        assert!(!config.paths.disaggregated.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stages_chain_through_files() {
        let dir = std::env::temp_dir().join("flood_events_pipeline_stages_test");
        let _ = std::fs::remove_dir_all(&dir);
        write_inputs(&dir);
        let config = config_in(&dir);

        disaggregate(&config, &hidden()).unwrap();
        let records = postprocess(&config, &hidden()).unwrap();
        summarize(&config).unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E1", "E1", "E3", "E2"]);
        assert!(config.paths.summary.is_file());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
