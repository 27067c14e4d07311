fn main() -> anyhow::Result<()> {
    storefront_telemetry::run()
}
