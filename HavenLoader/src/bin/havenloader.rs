fn main() -> anyhow::Result<()> {
    havenloader::cli::run_cli()
}
