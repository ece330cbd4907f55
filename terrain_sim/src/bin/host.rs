use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use terrain_sim::{
    load_host_config_from_env, Canvas, CanvasError, ChannelOrder, Key, KeyDispatch,
    ManifestLoader, ModuleCatalog, ModuleDescriptor, ModuleHost,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host_config = load_host_config_from_env();
    let loader = ManifestLoader::new(&host_config.manifest_path, ModuleCatalog::builtin())
        .with_build_step(host_config.build_step());

    let mut host = match ModuleHost::start(loader, host_config.reload_key) {
        Ok(host) => host,
        Err(err) => {
            error!(
                target: "terrain::host",
                manifest = %host_config.manifest_path.display(),
                error = %err,
                "module.start.failed"
            );
            return ExitCode::FAILURE;
        }
    };

    let (sender, events) = unbounded::<HostEvent>();
    spawn_stdin_listener(sender.clone());
    let _watcher = if host_config.watch_manifest {
        spawn_manifest_watcher(&host_config.manifest_path, sender)
    } else {
        drop(sender);
        None
    };

    let mut surface = Surface::new(host.descriptor(), host_config.channel_order);
    info!(
        target: "terrain::host",
        reload_key = %host_config.reload_key,
        watch_manifest = host_config.watch_manifest,
        "terrain host ready"
    );

    run_frame_loop(&mut host, &mut surface, &events);
    info!(target: "terrain::host", reloads = host.reload_count(), "host.closed");
    ExitCode::SUCCESS
}

#[derive(Debug, PartialEq)]
enum HostEvent {
    Key(Key),
    Reload,
    Dump(PathBuf),
    Close,
}

fn run_frame_loop(
    host: &mut ModuleHost<ManifestLoader>,
    surface: &mut Surface,
    events: &Receiver<HostEvent>,
) {
    let mut last_frame = Instant::now();
    loop {
        let budget = frame_budget(host.descriptor());
        let deadline = last_frame + budget;

        let mut reload_requested = false;
        loop {
            match events.recv_deadline(deadline) {
                Ok(HostEvent::Close) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(HostEvent::Reload) => reload_requested = true,
                Ok(HostEvent::Key(key)) => {
                    if host.handle_key(key) == KeyDispatch::Reloaded {
                        surface.fit(host.descriptor());
                    }
                }
                Ok(HostEvent::Dump(path)) => {
                    if let Err(err) = surface.write_ppm(&path) {
                        warn!(
                            target: "terrain::host",
                            path = %path.display(),
                            error = %err,
                            "frame.dump_failed"
                        );
                    } else {
                        info!(target: "terrain::host", path = %path.display(), "frame.dumped");
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        // Watchers fire several events per save; one reload covers them all.
        if reload_requested && host.reload().is_ok() {
            surface.fit(host.descriptor());
        }

        let now = Instant::now();
        let delta_seconds = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        match surface.canvas() {
            Ok(mut canvas) => host.update(&mut canvas, delta_seconds),
            Err(err) => {
                warn!(target: "terrain::host", error = %err, "frame.skipped");
                continue;
            }
        }
        surface.present();
    }
}

fn frame_budget(descriptor: &ModuleDescriptor) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(descriptor.target_fps.max(1)))
}

/// Headless stand-in for a window: the module's ARGB frame plus the converted copy
/// a real surface would receive.
struct Surface {
    width: u32,
    height: u32,
    frame: Vec<u32>,
    presented: Vec<u32>,
    channel_order: ChannelOrder,
}

impl Surface {
    fn new(descriptor: &ModuleDescriptor, channel_order: ChannelOrder) -> Self {
        let len = descriptor.width as usize * descriptor.height as usize;
        Self {
            width: descriptor.width,
            height: descriptor.height,
            frame: vec![0; len],
            presented: vec![0; len],
            channel_order,
        }
    }

    /// Reallocate when a reload changed the module's surface size.
    fn fit(&mut self, descriptor: &ModuleDescriptor) {
        if (self.width, self.height) == (descriptor.width, descriptor.height) {
            return;
        }
        info!(
            target: "terrain::host",
            from_width = self.width,
            from_height = self.height,
            to_width = descriptor.width,
            to_height = descriptor.height,
            "surface.resized"
        );
        *self = Surface::new(descriptor, self.channel_order);
    }

    fn canvas(&mut self) -> Result<Canvas<'_>, CanvasError> {
        Canvas::new(&mut self.frame, self.width as usize, self.height as usize)
    }

    fn present(&mut self) {
        let order = self.channel_order;
        for (out, &pixel) in self.presented.iter_mut().zip(&self.frame) {
            *out = order.from_argb(pixel);
        }
    }

    fn write_ppm(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        for &pixel in &self.presented {
            let (r, g, b) = match self.channel_order {
                ChannelOrder::Argb => (pixel >> 16, pixel >> 8, pixel),
                ChannelOrder::Abgr => (pixel, pixel >> 8, pixel >> 16),
            };
            out.write_all(&[r as u8, g as u8, b as u8])?;
        }
        out.flush()
    }
}

fn spawn_stdin_listener(sender: Sender<HostEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(target: "terrain::host", error = %err, "stdin.read_failed");
                    break;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_line(trimmed) {
                Some(event) => {
                    if sender.send(event).is_err() {
                        return;
                    }
                }
                None => warn!(target: "terrain::host", input = trimmed, "command.invalid"),
            }
        }
        let _ = sender.send(HostEvent::Close);
    });
}

fn parse_line(input: &str) -> Option<HostEvent> {
    let mut chars = input.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(HostEvent::Key(Key::Char(c)));
    }

    let mut parts = input.split_whitespace();
    match parts.next()? {
        "reload" => Some(HostEvent::Reload),
        "quit" | "close" => Some(HostEvent::Close),
        "dump" => parts.next().map(|path| HostEvent::Dump(PathBuf::from(path))),
        "key" => {
            let code: u32 = parts.next()?.parse().ok()?;
            Some(HostEvent::Key(Key::Code(code)))
        }
        _ => None,
    }
}

fn spawn_manifest_watcher(path: &Path, sender: Sender<HostEvent>) -> Option<RecommendedWatcher> {
    let handler = move |result: notify::Result<notify::Event>| match result {
        Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
            debug!(target: "terrain::host", paths = ?event.paths, "manifest.changed");
            let _ = sender.send(HostEvent::Reload);
        }
        Ok(_) => {}
        Err(err) => warn!(target: "terrain::host", error = %err, "manifest.watch_error"),
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(watcher) => watcher,
        Err(err) => {
            warn!(target: "terrain::host", error = %err, "manifest.watch_unavailable");
            return None;
        }
    };
    if let Err(err) = watcher.watch(path, RecursiveMode::NonRecursive) {
        warn!(
            target: "terrain::host",
            path = %path.display(),
            error = %err,
            "manifest.watch_unavailable"
        );
        return None;
    }
    Some(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_lines() {
        assert_eq!(parse_line("g"), Some(HostEvent::Key(Key::Char('g'))));
        assert_eq!(parse_line("reload"), Some(HostEvent::Reload));
        assert_eq!(parse_line("quit"), Some(HostEvent::Close));
        assert_eq!(
            parse_line("dump frame.ppm"),
            Some(HostEvent::Dump(PathBuf::from("frame.ppm")))
        );
        assert_eq!(parse_line("key 27"), Some(HostEvent::Key(Key::Code(27))));
        assert_eq!(parse_line("dump"), None);
        assert_eq!(parse_line("teleport"), None);
    }
}
