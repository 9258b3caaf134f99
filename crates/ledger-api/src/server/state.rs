#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<RewardsEngine>>,
    directory: InMemoryDirectory,
}

impl AppState {
    fn new(engine: RewardsEngine, directory: InMemoryDirectory) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            directory,
        }
    }
}
