mod app;
mod sim;
pub use app::App;

fn main() -> anyhow::Result<()> {
    let app = App::from_args()?;
    app.run()?;

    Ok(())
}
