fn main() -> anyhow::Result<()> {
    blush_notes::cli::run()
}
