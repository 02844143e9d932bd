//! Full lifecycle of a simulated anchor watch: geometry fan-out, manual
//! sector editing through the gesture editor, persistence across restarts.

use boatwatch_app::{
    ChannelWatcher, EditorAction, MonitorService, SectorEditor, WatchSettings,
};
use boatwatch_core::{SafeSector, SectorHandle, WatchEvent};
use boatwatch_daemon::{
    AnchorageConfig, LogAlarmSink, PersistenceStore, RingEstimator, StandardSectorGeometry,
    StdinSource,
};
use tokio::sync::mpsc;

fn simulated_settings() -> WatchSettings {
    WatchSettings {
        simulate: true,
        ..WatchSettings::default()
    }
}

fn spawn(store: PersistenceStore) -> (boatwatch_app::MonitorHandle, tokio::task::JoinHandle<()>) {
    MonitorService::new(
        simulated_settings(),
        Box::new(RingEstimator::new()),
        store,
        Box::new(LogAlarmSink::default()),
        Box::new(StdinSource::new()),
        AnchorageConfig::default(),
    )
    .spawn()
}

async fn next_sector(rx: &mut mpsc::UnboundedReceiver<WatchEvent>) -> SafeSector {
    loop {
        if let Some(WatchEvent::SafeSector(sector)) = rx.recv().await {
            return sector;
        }
    }
}

async fn sector_with_radius(
    rx: &mut mpsc::UnboundedReceiver<WatchEvent>,
    radius: f64,
) -> SafeSector {
    loop {
        let sector = next_sector(rx).await;
        if (sector.radius - radius).abs() < 1e-12 {
            return sector;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_watch_edit_and_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let store = PersistenceStore::with_dir(tmp.path());

    // ── First run: watch the simulated anchorage ──────────────────────
    let (handle, monitor) = spawn(store.clone());

    let (watcher_a, mut events_a) = ChannelWatcher::pair();
    let (watcher_b, mut events_b) = ChannelWatcher::pair();
    handle.register_watcher(watcher_a);
    let id_b = handle.register_watcher(watcher_b);

    // The estimator publishes a safe sector to every subscriber
    let sector = next_sector(&mut events_a).await;
    let _ = next_sector(&mut events_b).await;
    assert!(sector.radius > 0.0);
    assert!(sector.full_circle);

    // ── Manual edit: stretch the radius by dragging its handle ────────
    let mut editor = SectorEditor::new(StandardSectorGeometry);
    editor.set_sector(Some(sector));

    let grabbed = editor.pointer_down(
        1,
        sector.x + sector.radius,
        sector.y,
        sector.radius * 0.5,
    );
    assert_eq!(grabbed, Some(SectorHandle::Radius));

    let preview_radius = sector.radius * 2.0;
    let Some(EditorAction::Preview(preview)) =
        editor.pointer_move(1, sector.x + preview_radius, sector.y)
    else {
        panic!("expected a preview per move");
    };
    handle.sector_preview(preview).unwrap();

    // Both subscribers observe the live preview
    let seen_a = sector_with_radius(&mut events_a, preview_radius).await;
    let seen_b = sector_with_radius(&mut events_b, preview_radius).await;
    assert_eq!(seen_a, seen_b);

    // One subscriber leaves before the drag is released
    assert!(handle.unregister_watcher(id_b));

    // Releasing commits through engine reconciliation
    let final_radius = sector.radius * 3.0;
    let Some(EditorAction::Commit(committed)) =
        editor.pointer_up(1, sector.x + final_radius, sector.y)
    else {
        panic!("expected a commit on release");
    };
    handle.sector_commit(committed).unwrap();
    let adopted = sector_with_radius(&mut events_a, final_radius).await;

    // The remaining subscriber keeps receiving the fix stream
    loop {
        if let Some(WatchEvent::Location(_)) = events_a.recv().await {
            break;
        }
    }

    // ── Stop and persist ──────────────────────────────────────────────
    handle.stop(false);
    monitor.await.unwrap();

    // Everything the departed subscriber ever got predates its exit: the
    // committed sector never reached it.
    while let Ok(event) = events_b.try_recv() {
        if let WatchEvent::SafeSector(s) = event {
            assert!((s.radius - final_radius).abs() > 1e-12);
        }
    }

    let persisted = store.load().expect("snapshot written on stop");
    let saved = persisted.safe.expect("safe sector in snapshot");
    assert!(persisted.manual_sector);
    assert!((saved.radius - adopted.radius).abs() < 1e-9);
    assert!((saved.x - adopted.x).abs() < 1e-9);
    assert!((saved.y - adopted.y).abs() < 1e-9);

    // ── Restart: the restored watch carries the same boundary ─────────
    let (handle2, monitor2) = spawn(store.clone());
    handle2.stop(false);
    monitor2.await.unwrap();

    let reloaded = store.load().expect("snapshot survives restart");
    let restored = reloaded.safe.expect("safe sector restored");
    assert!((restored.radius - saved.radius).abs() < 1e-9);
    assert!(reloaded.manual_sector);

    // ── Forget-stop wipes the slate ───────────────────────────────────
    let (handle3, monitor3) = spawn(store.clone());
    handle3.stop(true);
    monitor3.await.unwrap();
    assert!(store.load().is_none());
}
