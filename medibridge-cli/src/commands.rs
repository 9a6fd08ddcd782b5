//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use medibridge_core::{
    ApiClient, DrugRecord, MedibridgeConfig, MedibridgeError, PrescriptionDraft,
    PrescriptionPayload, Session, SessionStore,
};
use medibridge_search::{DebouncedSearch, DrugLookup, LocalProvider};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a registered mobile number
    Login {
        /// Registered mobile number
        mobile: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token (the cached drug list is kept)
    Logout,
    /// Show who is logged in
    Whoami,
    /// Drug catalogue lookups and imports
    Drugs {
        #[command(subcommand)]
        command: DrugCommands,
    },
    /// Patient lookups
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Validate and submit a prescription draft file
    Prescribe {
        /// Path to a JSON prescription draft
        draft: PathBuf,
        /// Print the request body instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Drug subcommands
#[derive(Subcommand)]
pub enum DrugCommands {
    /// Search drugs by partial name
    Search {
        /// At least two characters of the drug name
        query: String,
        /// Search the imported catalogue instead of the API
        #[arg(long)]
        local: bool,
    },
    /// Show how many drugs are available
    Count {
        /// Count the imported catalogue instead of the API
        #[arg(long)]
        local: bool,
    },
    /// Import a drug list from a comma-separated file with a header row
    ///
    /// Without `--persist` the file is only checked and nothing is stored.
    Import {
        /// File with at least a `name` column
        file: PathBuf,
        /// Replace the session's cached list for later `--local` searches
        #[arg(long)]
        persist: bool,
    },
    /// Read queries line by line from stdin and search as you type
    Watch {
        /// Search the imported catalogue instead of the API
        #[arg(long)]
        local: bool,
    },
}

/// Patient subcommands
#[derive(Subcommand)]
pub enum PatientCommands {
    /// Search patients by name or id
    Search {
        /// Name or patient id
        query: String,
    },
}

/// Shared state for a single CLI invocation.
struct CliContext {
    config: MedibridgeConfig,
    store: SessionStore,
    session: Session,
    demo: bool,
}

impl CliContext {
    async fn load(demo: bool) -> anyhow::Result<Self> {
        Self::with_config(MedibridgeConfig::from_env(), demo).await
    }

    async fn with_config(config: MedibridgeConfig, demo: bool) -> anyhow::Result<Self> {
        config.validate().map_err(MedibridgeError::from)?;

        let store = SessionStore::new(&config.session.path);
        let session = store.load().await.map_err(MedibridgeError::from)?;

        Ok(Self {
            config,
            store,
            session,
            demo,
        })
    }

    fn api(&self) -> anyhow::Result<ApiClient> {
        Ok(ApiClient::new(&self.config.api).map_err(MedibridgeError::from)?)
    }

    fn token(&self) -> anyhow::Result<&str> {
        Ok(self.session.token().ok_or(MedibridgeError::NotLoggedIn)?)
    }

    async fn save_session(&self) -> anyhow::Result<()> {
        self.store
            .save(&self.session)
            .await
            .map_err(MedibridgeError::from)?;
        Ok(())
    }

    fn lookup(&self, local: bool) -> anyhow::Result<DrugLookup> {
        let search = &self.config.search;
        if self.demo {
            return Ok(DrugLookup::development(search));
        }
        if local {
            if self.session.cached_drugs.is_empty() {
                anyhow::bail!("No imported drug list; run `medibridge drugs import <file> --persist`");
            }
            let catalogue = LocalProvider::from_records(self.session.cached_drugs.clone());
            return Ok(DrugLookup::local(catalogue, search));
        }

        self.token()?;
        Ok(DrugLookup::remote(self.api()?, &self.session, search))
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command, wrapping `MedibridgeError` where the
/// core reported one
pub async fn handle_command(command: Commands, demo: bool) -> anyhow::Result<()> {
    let mut ctx = CliContext::load(demo).await?;

    match command {
        Commands::Login { mobile, password } => login(&mut ctx, mobile, password).await,
        Commands::Logout => logout(&mut ctx).await,
        Commands::Whoami => {
            whoami(&ctx);
            Ok(())
        }
        Commands::Drugs { command } => match command {
            DrugCommands::Search { query, local } => search_drugs(&ctx, &query, local).await,
            DrugCommands::Count { local } => count_drugs(&ctx, local).await,
            DrugCommands::Import { file, persist } => import_drugs(&mut ctx, &file, persist).await,
            DrugCommands::Watch { local } => watch_drugs(&ctx, local).await,
        },
        Commands::Patients { command } => match command {
            PatientCommands::Search { query } => search_patients(&ctx, &query).await,
        },
        Commands::Prescribe { draft, dry_run } => prescribe(&ctx, &draft, dry_run).await,
    }
}

async fn login(ctx: &mut CliContext, mobile: String, password: String) -> anyhow::Result<()> {
    let response = ctx
        .api()?
        .login(&mobile, &password)
        .await
        .map_err(MedibridgeError::from)?;

    ctx.session.sign_in(response.token, response.role, mobile);
    ctx.save_session().await?;

    println!("Logged in as {}", response.role);
    Ok(())
}

async fn logout(ctx: &mut CliContext) -> anyhow::Result<()> {
    ctx.session.sign_out();
    ctx.save_session().await?;
    println!("Logged out");
    Ok(())
}

fn whoami(ctx: &CliContext) {
    match (&ctx.session.user_id, ctx.session.role) {
        (Some(user), Some(role)) if ctx.session.is_signed_in() => {
            println!("{user} ({role})");
        }
        _ => println!("Not logged in"),
    }
    println!(
        "Cached drugs: {} (session file: {})",
        ctx.session.cached_drugs.len(),
        ctx.store.path().display()
    );
}

async fn search_drugs(ctx: &CliContext, query: &str, local: bool) -> anyhow::Result<()> {
    let lookup = ctx.lookup(local)?;

    if !lookup.is_searchable(query) {
        println!(
            "Type at least {} characters to search",
            ctx.config.search.min_query_chars
        );
        return Ok(());
    }

    print_results(query, &lookup.search(query).await);
    Ok(())
}

async fn count_drugs(ctx: &CliContext, local: bool) -> anyhow::Result<()> {
    let size = ctx.lookup(local)?.catalog_size().await?;
    println!("{size} drugs available in database");
    Ok(())
}

async fn import_drugs(ctx: &mut CliContext, file: &Path, persist: bool) -> anyhow::Result<()> {
    let text = fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let catalogue = LocalProvider::new();
    let report = catalogue
        .import_csv(&text, &ctx.config.import.default_category)
        .with_context(|| format!("Import of {} rejected", file.display()))?;

    println!(
        "Imported {} drugs ({} rows skipped)",
        report.drugs.len(),
        report.skipped_rows
    );

    if persist {
        ctx.session.cached_drugs = catalogue.records();
        ctx.save_session().await?;
        println!("Saved to {}", ctx.store.path().display());
    }
    Ok(())
}

async fn watch_drugs(ctx: &CliContext, local: bool) -> anyhow::Result<()> {
    let lookup = Arc::new(ctx.lookup(local)?);
    let debounced = DebouncedSearch::new(lookup, ctx.config.search.debounce_delay);
    let mut receiver = debounced.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    debounced.submit(line);
                }
                None => break,
            },
            Ok(()) = receiver.changed() => {
                let snapshot = receiver.borrow_and_update().clone();
                printed = snapshot.generation;
                print_results(&snapshot.query, &snapshot.results);
            }
        }
    }

    let snapshot = debounced.settled().await;
    if snapshot.generation > printed {
        print_results(&snapshot.query, &snapshot.results);
    }
    Ok(())
}

async fn search_patients(ctx: &CliContext, query: &str) -> anyhow::Result<()> {
    let patients = ctx
        .api()?
        .search_patients(Some(ctx.token()?), query)
        .await
        .map_err(MedibridgeError::from)?;

    if patients.is_empty() {
        println!("No patients found matching \"{query}\"");
    }
    for patient in patients {
        println!("{:<12} {}", patient.id, patient.name);
    }
    Ok(())
}

async fn prescribe(ctx: &CliContext, draft_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let contents = fs::read_to_string(draft_path)
        .await
        .with_context(|| format!("Failed to read {}", draft_path.display()))?;
    let mut draft: PrescriptionDraft = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid prescription draft", draft_path.display()))?;

    let payload = submission_payload(&draft)?;

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let receipt = ctx
        .api()?
        .submit_prescription(Some(ctx.token()?), &payload)
        .await
        .map_err(MedibridgeError::from)?;

    println!("{}", receipt.message);
    if receipt.ai_processing_deferred {
        println!("Note: translation and audio will be generated later");
    }

    draft.reset_consultation();
    fs::write(draft_path, serde_json::to_string_pretty(&draft)?)
        .await
        .with_context(|| format!("Failed to reset {}", draft_path.display()))?;
    info!("Draft {} reset after submission", draft_path.display());
    Ok(())
}

/// Validates the draft. `clinic_id` is left empty: the server assigns it from
/// the bearer token's user id, not from anything the client knows.
fn submission_payload(draft: &PrescriptionDraft) -> anyhow::Result<PrescriptionPayload> {
    Ok(draft.build_payload("").map_err(MedibridgeError::from)?)
}

fn print_results(query: &str, results: &[DrugRecord]) {
    if results.is_empty() {
        println!("No drugs found matching \"{query}\"");
        return;
    }
    for drug in results {
        println!("{:<10} {}", drug.id(), drug.display_label());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::routing::post;
    use axum::{Json, Router};
    use medibridge_core::{DraftError, PatientSummary, Role};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    use super::*;

    /// Nothing listens here; any request would fail with a network error.
    const UNREACHABLE_API: &str = "http://127.0.0.1:9";

    async fn context(dir: &TempDir, base_url: &str, demo: bool) -> CliContext {
        let mut config = MedibridgeConfig::for_testing(base_url);
        config.session.path = dir.path().join("session.json");
        CliContext::with_config(config, demo).await.unwrap()
    }

    fn core_error(error: &anyhow::Error) -> &MedibridgeError {
        error
            .downcast_ref::<MedibridgeError>()
            .unwrap_or_else(|| panic!("not a MedibridgeError: {error:#}"))
    }

    async fn write_draft(dir: &TempDir, with_patient: bool) -> PathBuf {
        let mut draft = PrescriptionDraft::new();
        if with_patient {
            draft.select_patient(PatientSummary {
                id: "PAT001".to_string(),
                name: "Asha Patel".to_string(),
            });
        }
        draft.diagnosis = "Viral fever".to_string();
        draft.add_drug(DrugRecord::new("D1", "Paracetamol", None, None));

        let path = dir.path().join("draft.json");
        fs::write(&path, serde_json::to_string_pretty(&draft).unwrap())
            .await
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_local_lookup_without_import_bails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, UNREACHABLE_API, false).await;

        let error = ctx.lookup(true).unwrap_err();
        assert!(error.to_string().contains("drugs import"));
    }

    #[tokio::test]
    async fn test_remote_lookup_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, UNREACHABLE_API, false).await;

        let error = ctx.lookup(false).unwrap_err();
        assert!(matches!(core_error(&error), MedibridgeError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_demo_takes_precedence_over_local_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, UNREACHABLE_API, true).await;

        for local in [true, false] {
            let lookup = ctx.lookup(local).unwrap();
            let names: Vec<_> = lookup
                .search("para")
                .await
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            assert_eq!(names, ["Paracetamol", "Paracetamol Syrup"]);
        }
    }

    #[tokio::test]
    async fn test_import_with_persist_replaces_cached_drugs() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, UNREACHABLE_API, false).await;
        ctx.session.cached_drugs = vec![DrugRecord::new("OLD", "Old Drug", None, None)];
        let file = dir.path().join("drugs.csv");
        fs::write(&file, "id,name\nD1,Paracetamol\nD2,Cetirizine\n")
            .await
            .unwrap();

        import_drugs(&mut ctx, &file, true).await.unwrap();

        let stored = ctx.store.load().await.unwrap();
        let ids: Vec<_> = stored.cached_drugs.iter().map(|d| d.id()).collect();
        assert_eq!(ids, ["D1", "D2"]);

        let lookup = ctx.lookup(true).unwrap();
        assert_eq!(lookup.search("ceti").await.len(), 1);
    }

    #[tokio::test]
    async fn test_import_without_persist_only_validates() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, UNREACHABLE_API, false).await;
        let file = dir.path().join("drugs.csv");
        fs::write(&file, "name\nParacetamol\n").await.unwrap();

        import_drugs(&mut ctx, &file, false).await.unwrap();

        assert!(ctx.session.cached_drugs.is_empty());
        assert!(!ctx.store.path().exists());
    }

    #[tokio::test]
    async fn test_import_without_name_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, UNREACHABLE_API, false).await;
        let file = dir.path().join("drugs.csv");
        fs::write(&file, "id,title\nD1,Paracetamol\n").await.unwrap();

        assert!(import_drugs(&mut ctx, &file, true).await.is_err());
        assert!(!ctx.store.path().exists());
    }

    #[tokio::test]
    async fn test_prescribe_dry_run_leaves_draft_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, UNREACHABLE_API, false).await;
        let path = write_draft(&dir, true).await;
        let before = fs::read_to_string(&path).await.unwrap();

        prescribe(&ctx, &path, true).await.unwrap();

        assert_eq!(fs::read_to_string(&path).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_prescribe_without_patient_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, UNREACHABLE_API, false).await;
        ctx.session
            .sign_in("token".to_string(), Role::Clinic, "9000000001".to_string());
        let path = write_draft(&dir, false).await;

        let error = prescribe(&ctx, &path, false).await.unwrap_err();

        assert!(matches!(
            core_error(&error),
            MedibridgeError::Prescription(DraftError::NoPatientSelected)
        ));
    }

    #[test]
    fn test_payload_leaves_clinic_id_to_server() {
        let mut draft = PrescriptionDraft::new();
        draft.select_patient(PatientSummary {
            id: "PAT001".to_string(),
            name: "Asha Patel".to_string(),
        });
        draft.add_drug(DrugRecord::new("D1", "Paracetamol", None, None));

        let payload = submission_payload(&draft).unwrap();
        assert_eq!(payload.clinic_id, "");
        assert_eq!(payload.patient_id, "PAT001");
    }

    #[tokio::test]
    async fn test_prescribe_resets_draft_after_submission() {
        let received = Arc::new(Mutex::new(Vec::<Value>::new()));
        let recorder = Arc::clone(&received);
        let app = Router::new().route(
            "/v1/clinic/prescriptions/new",
            post(move |Json(body): Json<Value>| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().await.push(body);
                    Json(json!({ "message": "Prescription created" }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, &base_url, false).await;
        ctx.session
            .sign_in("token".to_string(), Role::Clinic, "9000000001".to_string());
        let path = write_draft(&dir, true).await;

        prescribe(&ctx, &path, false).await.unwrap();
        server.abort();

        let bodies = received.lock().await;
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["patient_id"], "PAT001");

        let draft: PrescriptionDraft =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert!(draft.entries().is_empty());
        assert!(draft.diagnosis.is_empty());
        assert_eq!(draft.patient.map(|p| p.id), Some("PAT001".to_string()));
    }
}
