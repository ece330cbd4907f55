mod common;

use common::{missing_image, render_frame, BlobModule, ScriptedLoader};
use terrain_sim::{Key, KeyDispatch, LoadError, ModuleHost};

#[test]
fn growing_state_zero_fills_the_tail() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 4).with_fresh_state(&[1, 2, 3, 4]))
        .then_module(BlobModule::new("v2", 8));
    let mut host = ModuleHost::start(loader, 'r')?;
    assert_eq!(host.active_state(), &[1, 2, 3, 4]);

    host.reload()?;
    assert_eq!(host.descriptor().name, "v2");
    assert_eq!(host.active_state(), &[1, 2, 3, 4, 0, 0, 0, 0]);
    Ok(())
}

#[test]
fn shrinking_state_truncates() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 6).with_fresh_state(&[1, 2, 3, 4, 5, 6]))
        .then_module(BlobModule::new("v2", 2));
    let mut host = ModuleHost::start(loader, 'r')?;

    host.reload()?;
    assert_eq!(host.active_state(), &[1, 2]);
    Ok(())
}

#[test]
fn same_layout_reload_is_identity() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 5).with_fresh_state(&[9, 0, 255, 7, 3]))
        .then_module(BlobModule::new("v1", 5));
    let mut host = ModuleHost::start(loader, 'r')?;
    let before = host.active_state().to_vec();

    host.reload()?;
    assert_eq!(host.active_state(), before.as_slice());
    Ok(())
}

#[test]
fn failed_reload_leaves_the_old_module_in_control() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 3).with_fresh_state(&[5, 6, 7]))
        .then_error(missing_image("broken.json"))
        .then_module(BlobModule::new("v3", 3));
    let mut host = ModuleHost::start(loader, 'r')?;
    let frame_before = render_frame(&mut host);

    let err = host.reload().unwrap_err();
    assert!(matches!(err, LoadError::ImageMissing { .. }));
    assert_eq!(host.descriptor().name, "v1");
    assert_eq!(host.active_state(), &[5, 6, 7]);
    assert_eq!(render_frame(&mut host), frame_before);
    assert_eq!(host.failed_reload_count(), 1);

    // Nothing was lost, so the next good image still receives the state.
    host.reload()?;
    assert_eq!(host.descriptor().name, "v3");
    assert_eq!(host.active_state(), &[5, 6, 7]);
    assert_eq!(host.reload_count(), 1);
    Ok(())
}

#[test]
fn zero_sized_state_is_not_carried() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 4).with_fresh_state(&[9, 9, 9, 9]))
        .then_module(BlobModule::new("stateless", 0))
        .then_module(BlobModule::new("v3", 4));
    let mut host = ModuleHost::start(loader, 'r')?;

    host.reload()?;
    assert!(host.active_state().is_empty());

    host.reload()?;
    assert_eq!(host.active_state(), &[0, 0, 0, 0]);
    Ok(())
}

#[test]
fn reload_key_is_handled_by_the_host() -> anyhow::Result<()> {
    let loader = ScriptedLoader::default()
        .then_module(BlobModule::new("v1", 2))
        .then_module(BlobModule::new("v2", 2));
    let mut host = ModuleHost::start(loader, 'r')?;

    assert_eq!(host.handle_key(Key::Char('x')), KeyDispatch::Forwarded);
    assert_eq!(host.active_state(), &[b'x', 0]);

    assert_eq!(host.handle_key(Key::Char('r')), KeyDispatch::Reloaded);
    assert_eq!(host.descriptor().name, "v2");
    // The module never saw the reload key.
    assert_eq!(host.active_state(), &[b'x', 0]);

    assert_eq!(host.handle_key(Key::Char('r')), KeyDispatch::ReloadFailed);
    assert_eq!(host.descriptor().name, "v2");
    assert_eq!(host.loader().attempts, 3);
    Ok(())
}

#[test]
fn startup_without_an_image_fails() {
    let loader = ScriptedLoader::default().then_error(missing_image("terrain_module.json"));
    assert!(matches!(
        ModuleHost::start(loader, 'r'),
        Err(LoadError::ImageMissing { .. })
    ));
}
