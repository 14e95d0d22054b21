use clap::Args;
use member_intake::config::AppConfig;
use member_intake::error::AppError;
use member_intake::telemetry;
use member_intake::workflows::membership::export::write_csv;
use member_intake::workflows::membership::{
    AdminRoster, ApplicationStore, HttpKnowledgeBase, JsonFileStore, LifecycleController,
    LogNotifier, SurveyDefinition,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Write the CSV to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = JsonFileStore::open(&config.intake.storage_path)?;
    let applications = store.list_all()?;
    let survey = SurveyDefinition::standard();

    match args.output {
        Some(path) => {
            let file = std::fs::File::create(&path)?;
            write_csv(file, &survey, &applications)?;
            println!(
                "exported {} applications to {}",
                applications.len(),
                path.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            write_csv(stdout.lock(), &survey, &applications)?;
        }
    }
    Ok(())
}

pub(crate) async fn run_sync_backlog() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if config.sync.is_none() {
        println!(
            "knowledge base sync is not configured; set KB_BASE_URL, KB_API_TOKEN, and KB_COLLECTION_ID"
        );
        return Ok(());
    }

    let store = Arc::new(JsonFileStore::open(&config.intake.storage_path)?);
    let knowledge_base = Arc::new(HttpKnowledgeBase::from_config(config.sync.as_ref()));
    let controller = Arc::new(LifecycleController::new(
        store,
        knowledge_base,
        Arc::new(LogNotifier),
        AdminRoster::new(config.intake.admin_ids.clone()),
        SurveyDefinition::standard(),
        config.intake.invite_link.clone(),
    ));

    // The push client is blocking; keep it off the async runtime.
    let report = tokio::task::spawn_blocking(move || controller.sync_backlog())
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;

    println!(
        "backlog pass: {} attempted, {} synced, {} failed",
        report.attempted, report.synced, report.failed
    );
    Ok(())
}
