mod app;
mod groups;
mod lifecycle;
mod settings;

fn main() -> anyhow::Result<()> {
    app::run()
}
