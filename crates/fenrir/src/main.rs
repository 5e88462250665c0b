pub fn main() -> miette::Result<()> {
    // A single thread drives the network, the child processes and the prompts.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed building the Runtime");

    runtime.block_on(fenrir_cli::execute())
}
