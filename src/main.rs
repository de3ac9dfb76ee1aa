use chilito::StudioApp;
use eframe::egui;
use eframe::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Chilito Studio")
            .with_inner_size([1200., 800.]),
        ..Default::default()
    };
    eframe::run_native(
        "Chilito Studio",
        native_options,
        Box::new(|cc| Ok(Box::new(StudioApp::new(cc)))),
    )?;
    Ok(())
}
