use std::path::PathBuf;

/// Host websocket address.  The port comes from the launch arguments.
const HOST_WS_HOST: &str = "127.0.0.1";

pub fn host_address(port: u16) -> String {
    format!("ws://{}:{}", HOST_WS_HOST, port)
}

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/ampdeck/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("ampdeck")
    }
    #[cfg(windows)]
    {
        // Portable install: a data/ directory beside the plugin binary wins
        if let Some(dir) = exe_dir() {
            let portable_data = dir.join("data");
            if portable_data.exists() {
                return portable_data;
            }
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ampdeck")
    }
}

pub fn config_dir() -> PathBuf {
    // A config.toml shipped inside the plugin bundle takes priority
    if let Some(dir) = exe_dir() {
        if dir.join("config.toml").exists() {
            return dir;
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("ampdeck")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ampdeck")
    }
}

pub fn log_path() -> PathBuf {
    data_dir().join("plugin.log")
}

/// Directory holding the running executable (the `.sdPlugin` bundle).
pub fn exe_dir() -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    current_exe.parent().map(|p| p.to_path_buf())
}

/// Candidate font files, in lookup order: bundled first, then common system
/// locations for each platform.
pub fn font_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(dir) = exe_dir() {
        out.push(dir.join("fonts").join("DejaVuSans-Bold.ttf"));
        out.push(dir.join("fonts").join("DejaVuSans.ttf"));
    }

    #[cfg(target_os = "macos")]
    {
        out.push(PathBuf::from("/System/Library/Fonts/Helvetica.ttc"));
        out.push(PathBuf::from("/System/Library/Fonts/SFNS.ttf"));
        out.push(PathBuf::from("/Library/Fonts/Arial.ttf"));
    }
    #[cfg(windows)]
    {
        out.push(PathBuf::from(r"C:\Windows\Fonts\segoeuib.ttf"));
        out.push(PathBuf::from(r"C:\Windows\Fonts\arialbd.ttf"));
        out.push(PathBuf::from(r"C:\Windows\Fonts\arial.ttf"));
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        out.push(PathBuf::from(
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        ));
        out.push(PathBuf::from("/usr/share/fonts/TTF/DejaVuSans-Bold.ttf"));
        out.push(PathBuf::from(
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        ));
    }
    out
}
