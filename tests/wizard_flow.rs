use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dockwizard::{
    Config, Element, GridAxis, GridBox, GridMode, HeadlessUi, JobStatus, Navigation, RunOutcome,
    SceneViewer, ScoringMethod, SearchMode, Step, StepButtonState, Tone, WizardError,
    WizardSession,
};

const PDB: &str = "ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N\nEND\n";

struct Backend {
    grid_reply: Mutex<(StatusCode, Value)>,
    grid_requests: Mutex<Vec<Value>>,
    prepare_requests: Mutex<Vec<Value>>,
    ligand_files: Mutex<Vec<String>>,
    params: Mutex<HashMap<String, String>>,
    start_reply: Mutex<(StatusCode, Value)>,
    statuses: Mutex<VecDeque<(StatusCode, Value)>>,
    run_starts: AtomicUsize,
    status_polls: AtomicUsize,
}

impl Default for Backend {
    fn default() -> Self {
        Backend {
            grid_reply: Mutex::new((
                StatusCode::OK,
                json!({
                    "message": "Grid configuration generated!",
                    "grid_dimensions": {
                        "center_x": 0.0, "center_y": 0.0, "center_z": 0.0,
                        "size_x": 20.0, "size_y": 20.0, "size_z": 20.0
                    }
                }),
            )),
            grid_requests: Mutex::new(Vec::new()),
            prepare_requests: Mutex::new(Vec::new()),
            ligand_files: Mutex::new(Vec::new()),
            params: Mutex::new(HashMap::new()),
            start_reply: Mutex::new((StatusCode::OK, json!({ "message": "started" }))),
            statuses: Mutex::new(VecDeque::from([(
                StatusCode::OK,
                json!({ "status": "completed", "log": "done" }),
            )])),
            run_starts: AtomicUsize::new(0),
            status_polls: AtomicUsize::new(0),
        }
    }
}

impl Backend {
    fn with_statuses(self, statuses: Vec<Value>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into_iter().map(|s| (StatusCode::OK, s)).collect();
        self
    }
}

type Shared = State<Arc<Backend>>;

async fn create_project(Json(body): Json<Value>) -> Json<Value> {
    let name = body["project_name"].as_str().unwrap_or_default();
    Json(json!({ "message": format!("Project \"{name}\" created successfully.") }))
}

async fn rec_upload(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            if !name.ends_with(".pdb") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Invalid file type. Please upload a PDB file." })),
                );
            }
            return (
                StatusCode::OK,
                Json(json!({ "message": "File uploaded successfully!", "filepath": "/tmp/r1.pdb" })),
            );
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "no file" })))
}

#[derive(Deserialize)]
struct PdbQuery {
    filepath: String,
}

async fn get_pdb(Query(q): Query<PdbQuery>) -> (StatusCode, String) {
    if q.filepath == "/tmp/r1.pdb" {
        (StatusCode::OK, PDB.to_string())
    } else {
        (StatusCode::NOT_FOUND, r#"{"error":"File not found."}"#.to_string())
    }
}

async fn grid(State(b): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    b.grid_requests.lock().unwrap().push(body);
    let (status, reply) = b.grid_reply.lock().unwrap().clone();
    (status, Json(reply))
}

async fn prepare_receptor(State(b): Shared, Json(body): Json<Value>) -> Json<Value> {
    b.prepare_requests.lock().unwrap().push(body);
    Json(json!({ "message": "Receptor prepared successfully!" }))
}

async fn lig_upload(State(b): Shared, mut multipart: Multipart) -> Json<Value> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("files[]") {
            let name = field.file_name().unwrap_or_default().to_string();
            b.ligand_files.lock().unwrap().push(name);
        }
    }
    let count = b.ligand_files.lock().unwrap().len();
    Json(json!({ "message": format!("Processed {count} ligands."), "count": count }))
}

async fn upload_params(State(b): Shared, mut multipart: Multipart) -> Json<Value> {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.unwrap_or_default();
        fields.insert(name, value);
    }
    *b.params.lock().unwrap() = fields;
    Json(json!({ "message": "Parameters saved as JSON successfully." }))
}

async fn run_docking(State(b): Shared) -> (StatusCode, Json<Value>) {
    b.run_starts.fetch_add(1, Ordering::SeqCst);
    let (status, reply) = b.start_reply.lock().unwrap().clone();
    (status, Json(reply))
}

async fn run_status(State(b): Shared) -> (StatusCode, Json<Value>) {
    b.status_polls.fetch_add(1, Ordering::SeqCst);
    let mut statuses = b.statuses.lock().unwrap();
    let (status, reply) = if statuses.len() > 1 {
        statuses.pop_front().unwrap()
    } else {
        statuses.front().cloned().unwrap()
    };
    (status, Json(reply))
}

async fn download_csv() -> String {
    "Ligand Name,Affinity (kcal/mol),Dist from RMSD l.b.\na,-7.2,0.000\n".to_string()
}

async fn serve(backend: Arc<Backend>) -> String {
    let app = Router::new()
        .route("/create-project", post(create_project))
        .route("/rec_upload", post(rec_upload))
        .route("/get_pdb", get(get_pdb))
        .route("/grid", post(grid))
        .route("/prepare_receptor", post(prepare_receptor))
        .route("/lig_upload", post(lig_upload))
        .route("/upload-params", post(upload_params))
        .route("/run-docking", post(run_docking))
        .route("/run-status", get(run_status))
        .route("/download_csv", get(download_csv))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

struct Harness {
    backend: Arc<Backend>,
    ui: Arc<HeadlessUi>,
    viewer: Arc<SceneViewer>,
    session: WizardSession,
    dir: tempfile::TempDir,
}

impl Harness {
    async fn new(backend: Backend) -> Self {
        let backend = Arc::new(backend);
        let url = serve(backend.clone()).await;
        let ui = Arc::new(HeadlessUi::new(true));
        let viewer = Arc::new(SceneViewer::new());
        let session = WizardSession::new(Config::immediate(&url), ui.clone(), viewer.clone()).unwrap();
        Harness {
            backend,
            ui,
            viewer,
            session,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn upload_receptor(&mut self) -> String {
        let receptor = self.file("r1.pdb", PDB);
        self.session.upload_receptor(Some(&receptor)).await.unwrap()
    }

    async fn reach_parameters(&mut self) {
        self.upload_receptor().await;
        self.session.prepare_receptor().await.unwrap();
        let ligands = vec![self.file("a.sdf", "a"), self.file("b.mol2", "b")];
        self.session.upload_ligands(&ligands).await.unwrap();
    }
}

fn cube(size: f64) -> GridBox {
    GridBox {
        center_x: 0.0,
        center_y: 0.0,
        center_z: 0.0,
        size_x: size,
        size_y: size,
        size_z: size,
    }
}

#[tokio::test]
async fn receptor_upload_generates_blind_grid() {
    let mut h = Harness::new(Backend::default()).await;
    h.session.create_project("demo").await.unwrap();

    assert_eq!(h.upload_receptor().await, "/tmp/r1.pdb");
    assert_eq!(h.session.uploaded_receptor(), Some("/tmp/r1.pdb"));

    let requests = h.backend.grid_requests.lock().unwrap().clone();
    assert_eq!(requests, vec![json!({ "filepath": "/tmp/r1.pdb", "mode": "blind" })]);

    assert_eq!(h.session.grid().live(), Some(cube(20.0)));
    assert_eq!(h.session.grid().initial(), Some(cube(20.0)));

    for axis in [GridAxis::CenterX, GridAxis::CenterY, GridAxis::CenterZ] {
        let range = h.ui.slider(axis).unwrap();
        assert_eq!((range.min, range.max), (-100.0, 100.0));
    }
    for axis in [GridAxis::SizeX, GridAxis::SizeY, GridAxis::SizeZ] {
        let range = h.ui.slider(axis).unwrap();
        assert_eq!((range.min, range.max), (1.0, 120.0));
    }

    let boxes = h.viewer.boxes();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].opacity, 0.3);
    let lines = h.viewer.lines();
    assert_eq!(lines.len(), 15);
    let edges = lines.iter().filter(|l| l.color == "green").count();
    assert_eq!(edges, 12);
    assert_eq!(h.viewer.models(), vec![("pdb".to_string(), PDB.to_string())]);
    assert!(h.viewer.resize_count() >= 1);

    assert!(h.ui.is_visible(Element::Workspace));
    assert!(h.ui.is_visible(Element::SliderPanel));
    assert_eq!(
        h.ui.text(Element::GridStatus),
        Some(("Grid Auto-Generated Successfully".to_string(), Tone::Success))
    );
    assert_eq!(
        h.ui.control(Element::ReceptorUploadButton),
        Some((true, "Upload".to_string()))
    );
}

#[tokio::test]
async fn grid_failure_keeps_previous_state() {
    let backend = Backend::default();
    *backend.grid_reply.lock().unwrap() = (
        StatusCode::BAD_REQUEST,
        json!({ "error": "File not found. Please upload a valid file." }),
    );
    let mut h = Harness::new(backend).await;

    h.upload_receptor().await;
    assert_eq!(
        h.ui.text(Element::GridStatus),
        Some(("File not found. Please upload a valid file.".to_string(), Tone::Danger))
    );
    assert_eq!(h.session.grid().live(), None);
    assert!(!h.ui.is_visible(Element::SliderPanel));
    assert!(h.viewer.boxes().is_empty());
}

#[tokio::test]
async fn server_rejection_is_shown_verbatim() {
    let mut h = Harness::new(Backend::default()).await;
    let wrong = h.file("r1.cif", "data_");
    let err = h.session.upload_receptor(Some(&wrong)).await.unwrap_err();
    assert!(matches!(err, WizardError::Server(_)));
    assert_eq!(
        h.ui.text(Element::ReceptorStatus),
        Some(("Invalid file type. Please upload a PDB file.".to_string(), Tone::Danger))
    );
    assert_eq!(h.session.uploaded_receptor(), None);
    assert_eq!(h.ui.control(Element::ReceptorUploadButton), Some((true, "Upload".to_string())));
}

#[tokio::test]
async fn missing_inputs_are_rejected_before_any_request() {
    let mut h = Harness::new(Backend::default()).await;

    assert!(matches!(
        h.session.upload_receptor(None).await,
        Err(WizardError::Validation(_))
    ));
    assert_eq!(
        h.ui.text(Element::ReceptorStatus),
        Some(("Please select a file.".to_string(), Tone::Danger))
    );

    assert!(h.session.prepare_receptor().await.is_err());
    assert!(h.session.upload_ligands(&[]).await.is_err());
    assert_eq!(
        h.ui.alerts(),
        vec!["Please generate the grid first.".to_string(), "Select files.".to_string()]
    );
    assert!(h.backend.grid_requests.lock().unwrap().is_empty());
    assert_eq!(h.session.state().unwrap().highest_reached_step, Step::Receptor);
}

#[tokio::test]
async fn prepare_sends_edited_grid_and_unlocks_ligands() {
    let mut h = Harness::new(Backend::default()).await;
    h.upload_receptor().await;
    h.session.on_slider_change(GridAxis::CenterX, 5.0).unwrap();
    h.session.on_slider_change(GridAxis::SizeY, 42.0).unwrap();

    h.session.prepare_receptor().await.unwrap();

    let body = h.backend.prepare_requests.lock().unwrap()[0].clone();
    assert_eq!(body["filepath"], "/tmp/r1.pdb");
    assert_eq!(body["grid"]["center_x"], 5.0);
    assert_eq!(body["grid"]["size_y"], 42.0);
    assert_eq!(body["grid"]["size_x"], 20.0);

    let state = h.session.state().unwrap();
    assert_eq!(state.current_step, Step::Ligands);
    assert_eq!(state.highest_reached_step, Step::Ligands);
    assert_eq!(h.ui.section(), Some(Step::Ligands));
    assert_eq!(h.ui.step_button(Step::Receptor), Some(StepButtonState::Completed));
    assert_eq!(h.ui.step_button(Step::Parameters), Some(StepButtonState::Disabled));
    assert_eq!(h.ui.text(Element::GridStatus), Some(("Success!".to_string(), Tone::Success)));

    // the snapshot is still the generated box
    assert_eq!(h.session.reset_grid().unwrap(), cube(20.0));
}

#[tokio::test]
async fn returning_to_receptor_step_resizes_viewer() {
    let mut h = Harness::new(Backend::default()).await;
    h.upload_receptor().await;
    h.session.prepare_receptor().await.unwrap();

    assert_eq!(h.session.navigate(Step::Run).await.unwrap(), Navigation::Locked);
    let before = h.viewer.resize_count();
    assert_eq!(
        h.session.navigate(Step::Receptor).await.unwrap(),
        Navigation::Moved(Step::Receptor)
    );
    assert_eq!(h.viewer.resize_count(), before + 1);
    assert_eq!(h.session.state().unwrap().highest_reached_step, Step::Ligands);
}

#[tokio::test]
async fn hovering_an_atom_updates_mouse_coords() {
    let mut h = Harness::new(Backend::default()).await;
    h.upload_receptor().await;
    assert!(h.viewer.hover(&dockwizard::viewer::HoveredAtom {
        position: dockwizard::viewer::Point3::new(11.104, 6.134, -6.504),
    }));
    assert_eq!(
        h.ui.text(Element::MouseCoords).map(|t| t.0),
        Some("X: 11.10 Y: 6.13 Z: -6.50".to_string())
    );
}

#[tokio::test]
async fn cpu_parameters_always_send_vina() {
    let mut h = Harness::new(Backend::default()).await;
    h.reach_parameters().await;
    assert_eq!(h.backend.ligand_files.lock().unwrap().clone(), vec!["a.sdf", "b.mol2"]);
    assert_eq!(
        h.ui.text(Element::LigandStatus),
        Some(("Processed 2 ligands.".to_string(), Tone::Success))
    );
    assert!(h.ui.is_visible(Element::ParamSetAction));
    assert_eq!(h.session.state().unwrap().current_step, Step::Parameters);

    h.session.set_gpu(true);
    h.session.set_scoring_method(ScoringMethod::Vinardo).unwrap();
    h.session.set_search_mode(SearchMode::Detail);
    h.session.set_gpu(false);
    assert_eq!(h.ui.control(Element::ScoringSelect), Some((false, "vina".to_string())));
    assert_eq!(h.ui.text(Element::ExhaustivenessInput).unwrap().0, "32");

    h.session.submit_params().await.unwrap();
    let params = h.backend.params.lock().unwrap().clone();
    assert_eq!(params["scoring_method"], "vina");
    assert_eq!(params["use_gpu"], "false");
    assert_eq!(params["search_mode"], "Detail");
    assert_eq!(params["exhaustiveness"], "32");

    let state = h.session.state().unwrap();
    assert_eq!(state.current_step, Step::Run);
    assert_eq!(state.highest_reached_step, Step::Run);
    assert!(h.ui.is_visible(Element::RunAction));
}

#[tokio::test]
async fn gpu_parameters_keep_chosen_scoring() {
    let mut h = Harness::new(Backend::default()).await;
    h.reach_parameters().await;
    h.session.set_gpu(true);
    h.session.set_scoring_method(ScoringMethod::Ad4).unwrap();
    h.session.set_exhaustiveness(12).unwrap();
    h.session.submit_params().await.unwrap();

    let params = h.backend.params.lock().unwrap().clone();
    assert_eq!(params["scoring_method"], "ad4");
    assert_eq!(params["use_gpu"], "true");
    assert_eq!(params["exhaustiveness"], "12");
}

#[tokio::test]
async fn run_is_followed_until_completed() {
    let backend = Backend::default().with_statuses(vec![
        json!({ "status": "running", "log": "Found 2 ligands.\nDocking 1 of 2: a.pdbqt...\n" }),
        json!({ "status": "running", "log": "Found 2 ligands.\nDocking 1 of 2: a.pdbqt...\nDocking 2 of 2: b.pdbqt...\n" }),
        json!({ "status": "completed", "log": "Found 2 ligands.\nDocking 1 of 2: a.pdbqt...\nDocking 2 of 2: b.pdbqt...\n...done" }),
    ]);
    let mut h = Harness::new(backend).await;

    assert_eq!(h.session.start_run().await.unwrap(), "started");
    assert!(h.session.state().unwrap().job_running);
    assert_eq!(h.session.wait_for_run().await.unwrap(), RunOutcome::Completed);

    assert!(h.backend.status_polls.load(Ordering::SeqCst) >= 3);
    assert!(h.ui.log().ends_with("...done"));
    assert_eq!(
        h.ui.text(Element::RunProgress).map(|t| t.0),
        Some("Docking 2 of 2: b.pdbqt".to_string())
    );
    assert_eq!(
        h.ui.text(Element::FinalStatus),
        Some(("Run Completed!".to_string(), Tone::Success))
    );
    assert!(h.ui.is_visible(Element::DownloadControl));
    assert!(!h.ui.is_visible(Element::RunLoader));
    assert!(!h.session.state().unwrap().job_running);
    assert_eq!(
        h.ui.control(Element::RunButton),
        Some((true, "Start Docking Simulation".to_string()))
    );

    let scores = h.dir.path().join("scores.csv");
    h.session.client().download_scores(&scores).await.unwrap();
    assert!(std::fs::read_to_string(&scores).unwrap().starts_with("Ligand Name"));
}

#[tokio::test]
async fn failed_run_shows_failure_banner() {
    let backend = Backend::default()
        .with_statuses(vec![json!({ "status": "error", "log": "Traceback", "message": "exit code 1" })]);
    let mut h = Harness::new(backend).await;

    h.session.start_run().await.unwrap();
    assert_eq!(
        h.session.wait_for_run().await.unwrap(),
        RunOutcome::Failed(JobStatus::Failed)
    );
    assert_eq!(
        h.ui.text(Element::FinalStatus),
        Some(("Run Failed. Check Log.".to_string(), Tone::Danger))
    );
    assert!(!h.ui.is_visible(Element::DownloadControl));
    assert!(!h.session.state().unwrap().job_running);
}

#[tokio::test]
async fn start_without_acknowledgement_reverts_to_idle() {
    let backend = Backend::default();
    *backend.start_reply.lock().unwrap() = (StatusCode::OK, json!({}));
    let mut h = Harness::new(backend).await;

    assert!(h.session.start_run().await.is_err());
    assert_eq!(h.ui.log(), "Error starting run: Unknown error");
    assert!(!h.session.state().unwrap().job_running);
    assert!(!h.session.is_polling());
    assert_eq!(h.backend.status_polls.load(Ordering::SeqCst), 0);

    *h.backend.start_reply.lock().unwrap() = (
        StatusCode::CONFLICT,
        json!({ "error": "A docking process is already running for this project." }),
    );
    assert!(h.session.start_run().await.is_err());
    assert_eq!(
        h.ui.log(),
        "Error starting run: A docking process is already running for this project."
    );
    assert!(matches!(
        h.session.wait_for_run().await,
        Err(WizardError::NoActiveRun)
    ));
}

#[tokio::test]
async fn second_start_is_refused_while_polling() {
    let backend = Backend::default().with_statuses(vec![json!({ "status": "running", "log": "" })]);
    let mut h = Harness::new(backend).await;

    h.session.start_run().await.unwrap();
    assert!(matches!(
        h.session.start_run().await,
        Err(WizardError::RunInProgress)
    ));
    assert_eq!(h.backend.run_starts.load(Ordering::SeqCst), 1);

    h.session.stop_following_run();
    assert!(!h.session.is_polling());
    assert!(!h.session.state().unwrap().job_running);
}

#[tokio::test]
async fn polling_error_stops_and_warns() {
    let backend = Backend::default();
    *backend.statuses.lock().unwrap() = VecDeque::from([(
        StatusCode::BAD_REQUEST,
        json!({ "error": "No active project found." }),
    )]);
    let mut h = Harness::new(backend).await;

    h.session.start_run().await.unwrap();
    let outcome = h.session.wait_for_run().await.unwrap();
    assert_eq!(outcome, RunOutcome::Lost("No active project found.".to_string()));
    let (banner, tone) = h.ui.text(Element::FinalStatus).unwrap();
    assert_eq!(tone, Tone::Warning);
    assert!(banner.contains("No active project found."));
    assert!(!h.session.state().unwrap().job_running);
}

#[tokio::test]
async fn restart_after_stop_stays_running() {
    let backend = Backend::default().with_statuses(vec![json!({ "status": "running", "log": "" })]);
    let mut h = Harness::new(backend).await;

    h.session.start_run().await.unwrap();
    h.session.stop_following_run();
    h.session.start_run().await.unwrap();
    // several poll periods, long enough for the stopped task to have woken
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(h.backend.run_starts.load(Ordering::SeqCst), 2);
    assert!(h.session.is_polling());
    assert!(h.session.state().unwrap().job_running);
    assert!(h.ui.is_visible(Element::RunLoader));
    assert_eq!(h.ui.control(Element::RunButton), Some((false, "Running...".to_string())));

    h.session.stop_following_run();
    assert!(!h.session.state().unwrap().job_running);
}

#[tokio::test]
async fn targeted_grid_replaces_box_and_snapshot() {
    let mut h = Harness::new(Backend::default()).await;
    h.upload_receptor().await;

    let pocket = GridBox {
        center_x: 4.5,
        center_y: -2.0,
        center_z: 10.25,
        size_x: 12.0,
        size_y: 14.0,
        size_z: 16.0,
    };
    *h.backend.grid_reply.lock().unwrap() = (
        StatusCode::OK,
        json!({ "message": "Grid configuration generated!", "grid_dimensions": pocket }),
    );

    let mode = GridMode::targeted(["A:45", " B:12 "]).unwrap();
    assert_eq!(h.session.generate_grid(&mode).await.unwrap(), pocket);

    let requests = h.backend.grid_requests.lock().unwrap().clone();
    assert_eq!(
        requests[1],
        json!({ "filepath": "/tmp/r1.pdb", "mode": "targeted", "residues": ["A:45", "B:12"] })
    );
    assert_eq!(h.session.grid().live(), Some(pocket));
    assert_eq!(h.session.grid().initial(), Some(pocket));
    let range = h.ui.slider(GridAxis::CenterX).unwrap();
    assert_eq!((range.min, range.max, range.value), (-95.5, 104.5, 4.5));

    h.session.on_slider_change(GridAxis::SizeZ, 30.0).unwrap();
    assert_eq!(h.session.reset_grid().unwrap(), pocket);
}

#[tokio::test]
async fn targeted_grid_needs_a_receptor() {
    let mut h = Harness::new(Backend::default()).await;
    let mode = GridMode::targeted(["A:45"]).unwrap();
    assert!(matches!(
        h.session.generate_grid(&mode).await,
        Err(WizardError::Validation(_))
    ));
    assert!(h.backend.grid_requests.lock().unwrap().is_empty());
}
