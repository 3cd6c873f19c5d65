fn main() -> anyhow::Result<()> {
    j3dkit::cli::run_cli()
}
