// The event manager is single-threaded, so the whole session runs on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_arena::init().await
}
