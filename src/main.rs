fn main() -> anyhow::Result<()> {
    notes_app_lib::run()
}
