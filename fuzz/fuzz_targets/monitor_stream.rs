#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use tkwatch_log_monitor::{
    AuditSink, LogMonitorError, MonitorConfigBuilder, TeamKillMonitorBuilder,
};

/// 퍼저용 구조적 입력 -- 로그 ID와 이름을 작은 범위로 묶어 상관 분석이 실제로 일어나게 함
#[derive(Arbitrary, Debug)]
enum FuzzLine {
    Damage { log_id: u16, victim: u8, killer: u8 },
    TeamKill { log_id: u16 },
    Possess { log_id: u16, user: u8 },
    Unpossess { log_id: u16, user: u8 },
    Raw(String),
}

impl FuzzLine {
    fn render(&self) -> String {
        const TIME: &str = "2024.01.01-00.00.00:000";
        match self {
            Self::Damage { log_id, victim, killer } => format!(
                "[{TIME}][{log_id}]LogSquad: Player:V{victim} ActualDamage=100.000000 from K{killer} caused by BP_AK47_C_1"
            ),
            Self::TeamKill { log_id } => format!(
                "[{TIME}][{log_id}]LogSquadScorePoints: Verbose: ScorePoints: Points: -1.000000 ScoreEvent: TeamKilled K"
            ),
            Self::Possess { log_id, user } => format!(
                "[{TIME}][{log_id}]LogSquadTrace: [DedicatedServer]ASQPlayerController::Possess(): PC=U{user} Pawn=CameraMan_C_1 FullPath=CameraMan_C /Game/Maps.CameraMan_C_1"
            ),
            Self::Unpossess { log_id, user } => format!(
                "[{TIME}][{log_id}]LogSquadTrace: [DedicatedServer]ASQPlayerController::UnPossess(): PC=U{user}"
            ),
            Self::Raw(line) => line.clone(),
        }
    }
}

struct NullSink;

impl AuditSink for NullSink {
    fn append(&mut self, _line: &str) -> Result<(), LogMonitorError> {
        Ok(())
    }
}

fuzz_target!(|lines: Vec<FuzzLine>| {
    let Ok(config) = MonitorConfigBuilder::new()
        .server_name("fuzz")
        .log_path("/dev/null")
        .admincam_log_path("/dev/null")
        .damage_window_size(8)
        .build()
    else {
        return;
    };
    let Ok(mut monitor) = TeamKillMonitorBuilder::new()
        .config(config)
        .audit_sink(Box::new(NullSink))
        .build()
    else {
        return;
    };

    let mut emitted = 0u64;
    for line in &lines {
        if monitor.process_line(&line.render()).is_some() {
            emitted += 1;
        }
        assert!(monitor.window().len() <= 8);
    }
    assert_eq!(monitor.stats().teamkills, emitted);
});
