//! 통합 테스트 -- 실제 파일을 통한 모니터 전체 흐름 검증
//!
//! 임시 디렉토리에 게임 로그를 만들고, 모니터를 백그라운드 태스크로 실행한 뒤
//! 라인을 덧붙여 채널로 나오는 팀킬 이벤트와 감사 로그를 확인합니다.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tkwatch_core::config::{MonitorSection, ServerConfig};
use tkwatch_core::event::{Event, TeamKillEvent};
use tkwatch_log_monitor::{
    LogMonitorError, MonitorConfig, MonitorConfigBuilder, TeamKillMonitor,
};

const WAIT: Duration = Duration::from_secs(5);

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}

fn test_config(dir: &Path) -> MonitorConfig {
    MonitorConfigBuilder::new()
        .server_name("integration")
        .log_path(dir.join("SquadGame.log"))
        .admincam_log_path(dir.join("admincam.log"))
        .poll_interval(Duration::from_millis(10))
        .build()
        .unwrap()
}

async fn recv(rx: &mut mpsc::Receiver<TeamKillEvent>) -> TeamKillEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for teamkill event")
        .expect("channel closed")
}

async fn wait_for_file(path: &Path, expected_lines: usize) -> Vec<String> {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        if lines.len() >= expected_lines || tokio::time::Instant::now() > deadline {
            return lines;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 모니터가 파일을 열 때까지 기다립니다. 열기 전에 쓴 내용은 건너뛰므로 필요합니다.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn teamkill_flows_from_file_to_channel() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    append(&config.log_path, "[2024.01.01-00.00.00:000][1]LogInit: previous session\n");

    let monitor = TeamKillMonitor::new(config.clone()).unwrap();
    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(tx, cancel.child_token()));
    settle().await;

    append(
        &config.log_path,
        "[2024.01.01-00.00.00:000][55]LogSquad: Player:V ActualDamage=100.000000 from K caused by BP_AK47_C_2147\n\
         [2024.01.01-00.00.00:050][56]LogNet: unrelated\n\
         [2024.01.01-00.00.00:100][55]LogSquadScorePoints: Verbose: ScorePoints: Points: -1.000000 ScoreEvent: TeamKilled K\n\
         [2024.01.01-00.00.00:150][55]LogSquadScorePoints: Verbose: ScorePoints: Points: -1.000000 ScoreEvent: TeamKilled K\n",
    );

    let event = recv(&mut rx).await;
    assert_eq!(event.server, "integration");
    assert_eq!(event.event_type(), "teamkill");
    assert_eq!(event.teamkill.victim, "V");
    assert_eq!(event.teamkill.killer, "K");
    assert_eq!(event.teamkill.weapon, "AK47");
    assert_eq!(
        event.teamkill.time_utc.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        "2024-01-01T00:00:00Z"
    );

    // 중복 통지 라인까지 처리되도록 대기
    settle().await;
    cancel.cancel();
    let stats = tokio::time::timeout(WAIT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.teamkills, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.lines_read, 4);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn admincam_session_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    append(&config.log_path, "");

    let monitor = TeamKillMonitor::new(config.clone()).unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(tx, cancel.child_token()));
    settle().await;

    append(
        &config.log_path,
        "[2024.01.02-03.04.05:000][10]LogSquadTrace: [DedicatedServer]ASQPlayerController::Possess(): PC=Alice Pawn=CameraMan_C_2130 FullPath=x\n\
         [2024.01.02-03.05.00:000][11]LogSquadTrace: [DedicatedServer]ASQPlayerController::UnPossess(): PC=Bob\n\
         [2024.01.02-03.06.07:000][12]LogSquadTrace: [DedicatedServer]ASQPlayerController::UnPossess(): PC=Alice\n",
    );

    let lines = wait_for_file(&config.admincam_log_path, 2).await;
    assert_eq!(
        lines,
        vec![
            "[2024.01.02 - 03:04:05 UTC] ++++++++++++ ENTER: Alice".to_owned(),
            "[2024.01.02 - 03:06:07 UTC] --- POSSIBLE LEAVE: Alice".to_owned(),
        ]
    );

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.admincam_events, 2);
}

#[tokio::test]
async fn truncation_clears_window_and_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    append(&config.log_path, &"x".repeat(4096));

    let monitor = TeamKillMonitor::new(config.clone()).unwrap();
    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(tx, cancel.child_token()));
    settle().await;

    append(
        &config.log_path,
        "[2024.01.01-00.00.00:000][7]LogSquad: Player:Old ActualDamage=1 from K caused by BP_AK47_C\n",
    );
    settle().await;

    // 서버가 로그를 비우고 새로 시작
    std::fs::OpenOptions::new()
        .write(true)
        .open(&config.log_path)
        .unwrap()
        .set_len(0)
        .unwrap();
    settle().await;

    append(
        &config.log_path,
        "[2024.01.01-00.00.01:000][8]LogSquad: Player:New ActualDamage=1 from K caused by BP_SVD_C\n\
         [2024.01.01-00.00.02:000][7]LogSquadScorePoints: TeamKilled\n\
         [2024.01.01-00.00.03:000][8]LogSquadScorePoints: TeamKilled\n",
    );

    let event = recv(&mut rx).await;
    assert_eq!(event.teamkill.victim, "New");
    assert_eq!(event.teamkill.weapon, "SVD");

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.rotations, 1);
    // 로테이션 전에 기록된 데미지는 윈도우에서 사라짐
    assert_eq!(stats.unmatched_teamkills, 1);
}

#[tokio::test]
async fn missing_log_file_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let monitor = TeamKillMonitor::new(config).unwrap();
    let (tx, _rx) = mpsc::channel(8);

    let err = monitor
        .run(tx, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LogMonitorError::Open { .. }));
}

#[tokio::test]
async fn closed_channel_does_not_stop_tailing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    append(&config.log_path, "");

    let monitor = TeamKillMonitor::new(config.clone()).unwrap();
    let (tx, rx) = mpsc::channel(8);
    drop(rx);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(tx, cancel.child_token()));
    settle().await;

    append(
        &config.log_path,
        "[2024.01.01-00.00.00:000][3]LogSquad: Player:V ActualDamage=1 from K caused by BP_AK47_C\n\
         [2024.01.01-00.00.01:000][3]LogSquadScorePoints: TeamKilled\n\
         [2024.01.01-00.00.02:000][4]LogSquadTrace: ASQPlayerController::Possess(): PC=Alice Pawn=CameraMan_C_1\n",
    );
    wait_for_file(&config.admincam_log_path, 1).await;

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.teamkills, 1);
    assert_eq!(stats.events_dropped, 1);
    assert_eq!(stats.admincam_events, 1);
}

#[test]
fn config_from_core_uses_derived_paths() {
    let server = ServerConfig {
        name: "main".to_owned(),
        basedir: "/srv/squad".to_owned(),
        webhook_url: None,
        log_path: None,
        admincam_log_path: None,
        query_addr: None,
    };
    let config = MonitorConfig::from_core(&MonitorSection::default(), &server);
    config.validate().unwrap();

    assert_eq!(
        config.log_path,
        PathBuf::from("/srv/squad/SquadGame/Saved/Logs/SquadGame.log")
    );
    assert_eq!(config.damage_window_size, 20);
    assert_eq!(config.wraparound_slack, 500);
}
