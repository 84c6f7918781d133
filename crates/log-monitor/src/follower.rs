//! 로그 파일 팔로워 -- 게임 서버가 쓰고 있는 로그 파일을 `tail -f`처럼 따라갑니다.
//!
//! [`LogFollower`]는 다른 프로세스의 쓰기, 삭제, 이름 변경을 막지 않는
//! 공유 모드로 파일을 열고, 열린 시점의 파일 끝부터 새 라인을 하나씩 돌려줍니다.
//!
//! # 로테이션 감지
//! 읽을 라인이 더 없을 때만 검사합니다.
//! - 열린 핸들의 파일 크기가 기록된 크기보다 작아짐 (truncation)
//! - 경로가 가리키는 inode가 열린 핸들과 다름 (Unix 전용, rename 방식 로테이션)
//!
//! 로테이션이 감지되면 파일을 다시 열고 새 파일의 끝에서 이어 읽습니다.
//! 이전 파일에서 아직 읽지 못한 내용은 버려집니다.
//!
//! # 디코딩 실패
//! UTF-8로 해석할 수 없는 라인은 [`DECODE_ERROR_LINE`]으로 대체되어 전달되며,
//! 팔로워는 멈추지 않고 다음 라인을 계속 읽습니다.
//!
//! 개행 없이 최대 라인 길이를 넘는 바이트 열도 [`DECODE_ERROR_LINE`] 한 번으로
//! 전달되고, 그 라인의 나머지는 다음 개행까지 버려집니다.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use crate::config::DEFAULT_MAX_LINE_LENGTH;
use crate::error::LogMonitorError;

/// 디코딩에 실패한 라인 대신 전달되는 표식
pub const DECODE_ERROR_LINE: &str = "DECODE_ERROR";

/// Windows 공유 모드: FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE
#[cfg(windows)]
const SHARE_ALL: u32 = 0x1 | 0x2 | 0x4;

/// 열린 파일 핸들과 그 시점의 상태
struct OpenedFile {
    reader: BufReader<File>,
    size: u64,
    #[cfg(unix)]
    inode: u64,
}

/// 로그 파일 팔로워
///
/// 서버 한 대의 게임 로그 하나를 따라갑니다. 팔로워를 drop하면
/// 파일 핸들도 함께 닫힙니다.
pub struct LogFollower {
    /// 감시 중인 경로
    path: PathBuf,
    /// 현재 읽기 핸들
    reader: BufReader<File>,
    /// 마지막으로 기록한 파일 크기
    recorded_size: u64,
    /// 열린 핸들의 inode
    #[cfg(unix)]
    inode: u64,
    /// 개행을 아직 만나지 못한 바이트
    pending: Vec<u8>,
    /// 최대 라인 길이 (바이트)
    max_line_length: usize,
    /// 너무 긴 라인의 나머지를 버리는 중
    discarding: bool,
    /// 파일 끝 도달 후 재폴링 간격
    poll_interval: Duration,
    /// 파일 크기 재기록 주기 (라인 수)
    size_refresh_lines: usize,
    /// 크기 재기록 이후 읽은 라인 수
    line_counter: usize,
    /// 총 읽은 라인 수
    lines_read: u64,
    /// 로테이션으로 다시 연 횟수
    rotations: u64,
}

impl LogFollower {
    /// 파일을 공유 모드로 열고 현재 파일 끝으로 이동합니다.
    ///
    /// 파일을 열 수 없으면 [`LogMonitorError::Open`]을 반환합니다.
    pub async fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        size_refresh_lines: usize,
    ) -> Result<Self, LogMonitorError> {
        let path = path.into();
        let opened = open_at_end(&path).await?;

        tracing::info!(
            path = %path.display(),
            size = opened.size,
            "opened log file at end"
        );

        Ok(Self {
            path,
            reader: opened.reader,
            recorded_size: opened.size,
            #[cfg(unix)]
            inode: opened.inode,
            pending: Vec::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            discarding: false,
            poll_interval,
            size_refresh_lines: size_refresh_lines.max(1),
            line_counter: 0,
            lines_read: 0,
            rotations: 0,
        })
    }

    /// 최대 라인 길이를 바꿉니다. 0은 1로 취급합니다.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length.max(1);
        self
    }

    /// 다음 라인을 기다려 반환합니다.
    ///
    /// 읽을 라인이 없으면 폴링 간격만큼 대기한 뒤 다시 시도합니다.
    /// 일시적인 읽기 에러는 로그만 남기고 계속 진행하며,
    /// 로테이션 후 파일을 다시 열지 못한 경우에만 에러를 반환합니다.
    ///
    /// 취소해도 안전합니다. 읽다 만 바이트는 다음 호출에서 이어집니다.
    pub async fn next_line(&mut self) -> Result<String, LogMonitorError> {
        loop {
            match self.poll().await {
                Ok(Some(line)) => return Ok(line),
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(LogMonitorError::Io(e)) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "transient read error, retrying"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 대기 없이 한 단계를 수행합니다.
    ///
    /// 완성된 라인이 있으면 `Some`을 반환합니다. 없으면 로테이션을 검사하고
    /// (필요하면 파일을 다시 열고) `None`을 반환합니다.
    pub async fn poll(&mut self) -> Result<Option<String>, LogMonitorError> {
        loop {
            // pending이 max_line_length + 1 바이트를 넘지 않도록 읽기량을 제한
            let limit = (self.max_line_length + 1).saturating_sub(self.pending.len());
            let read = (&mut self.reader)
                .take(limit as u64)
                .read_until(b'\n', &mut self.pending)
                .await?;
            let complete = self.pending.last() == Some(&b'\n');

            if self.discarding {
                self.pending.clear();
                if complete {
                    self.discarding = false;
                    continue;
                }
                if read > 0 {
                    continue;
                }
                break;
            }

            if complete {
                let line = self.take_line();
                self.count_line().await;
                return Ok(Some(line));
            }

            if self.pending.len() > self.max_line_length {
                tracing::warn!(
                    path = %self.path.display(),
                    max_line_length = self.max_line_length,
                    "line exceeds maximum length, discarding until next newline"
                );
                self.pending.clear();
                self.discarding = true;
                self.count_line().await;
                return Ok(Some(DECODE_ERROR_LINE.to_owned()));
            }

            break;
        }

        // 완성된 라인 없음: 파일 끝
        if self.rotation_detected().await {
            self.reopen().await?;
        }
        Ok(None)
    }

    /// 감시 중인 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 로테이션으로 파일을 다시 연 횟수
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// 지금까지 읽은 라인 수
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// 마지막으로 기록한 파일 크기
    pub fn recorded_size(&self) -> u64 {
        self.recorded_size
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }

        match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e.utf8_error(),
                    "failed to decode log line"
                );
                DECODE_ERROR_LINE.to_owned()
            }
        }
    }

    async fn count_line(&mut self) {
        self.lines_read += 1;
        if self.line_counter == 0 {
            match self.reader.get_ref().metadata().await {
                Ok(meta) => self.recorded_size = meta.len(),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to refresh file size"
                ),
            }
        }
        self.line_counter = (self.line_counter + 1) % self.size_refresh_lines;
    }

    /// 파일이 잘렸거나 다른 파일로 바뀌었는지 확인합니다.
    ///
    /// stat 실패는 "로테이션 없음"으로 취급합니다.
    async fn rotation_detected(&self) -> bool {
        match self.reader.get_ref().metadata().await {
            Ok(meta) if meta.len() < self.recorded_size => {
                tracing::info!(
                    path = %self.path.display(),
                    recorded = self.recorded_size,
                    size = meta.len(),
                    "log file shrank, assuming truncation"
                );
                return true;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to stat open log file"
                );
                return false;
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            match tokio::fs::metadata(&self.path).await {
                Ok(meta) if meta.ino() != self.inode => {
                    tracing::info!(
                        path = %self.path.display(),
                        old_inode = self.inode,
                        new_inode = meta.ino(),
                        "log file replaced, assuming rotation"
                    );
                    return true;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to stat log path"
                ),
            }
        }

        false
    }

    async fn reopen(&mut self) -> Result<(), LogMonitorError> {
        let opened = open_at_end(&self.path).await.inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to reopen log file");
        })?;

        self.reader = opened.reader;
        self.recorded_size = opened.size;
        #[cfg(unix)]
        {
            self.inode = opened.inode;
        }
        self.pending.clear();
        self.discarding = false;
        self.line_counter = 0;
        self.rotations += 1;

        tracing::info!(
            path = %self.path.display(),
            size = self.recorded_size,
            rotations = self.rotations,
            "reopened log file at end"
        );
        Ok(())
    }
}

/// 다른 프로세스의 쓰기/삭제/이름 변경을 허용하는 모드로 파일을 엽니다.
async fn open_shared(path: &Path) -> std::io::Result<File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.read(true);
    #[cfg(windows)]
    options.share_mode(SHARE_ALL);
    options.open(path).await
}

async fn open_at_end(path: &Path) -> Result<OpenedFile, LogMonitorError> {
    let open_err = |source| LogMonitorError::Open {
        path: path.to_path_buf(),
        source,
    };

    let mut file = open_shared(path).await.map_err(open_err)?;
    let size = file.seek(SeekFrom::End(0)).await.map_err(open_err)?;

    #[cfg(unix)]
    let inode = {
        use std::os::unix::fs::MetadataExt;
        file.metadata().await.map_err(open_err)?.ino()
    };

    Ok(OpenedFile {
        reader: BufReader::new(file),
        size,
        #[cfg(unix)]
        inode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FAST: Duration = Duration::from_millis(10);

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
    }

    async fn drain(follower: &mut LogFollower) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = follower.poll().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn starts_at_end_of_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"old line 1\nold line 2\n");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        assert_eq!(follower.recorded_size(), 22);
        assert!(drain(&mut follower).await.is_empty());

        append(&path, b"new line\n");
        assert_eq!(drain(&mut follower).await, vec!["new line"]);
        assert_eq!(follower.lines_read(), 1);
    }

    #[tokio::test]
    async fn holds_partial_line_until_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        append(&path, b"half a ");
        assert!(follower.poll().await.unwrap().is_none());

        append(&path, b"line\r\nnext\n");
        assert_eq!(drain(&mut follower).await, vec!["half a line", "next"]);
    }

    #[tokio::test]
    async fn invalid_utf8_yields_sentinel_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        append(&path, b"bad \xff\xfe bytes\nstill alive\n");

        assert_eq!(
            drain(&mut follower).await,
            vec![DECODE_ERROR_LINE.to_owned(), "still alive".to_owned()]
        );
    }

    #[tokio::test]
    async fn overlong_line_is_dropped_with_bounded_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 1000)
            .await
            .unwrap()
            .with_max_line_length(1024);

        // 개행 없는 1 MiB 덩어리를 여러 번: 버퍼는 한도를 넘지 않아야 함
        let chunk = vec![0u8; 1024 * 1024];
        append(&path, &chunk);
        assert_eq!(follower.poll().await.unwrap().as_deref(), Some(DECODE_ERROR_LINE));
        for _ in 0..4 {
            append(&path, &chunk);
            assert!(follower.poll().await.unwrap().is_none());
            assert!(follower.pending.len() <= 1025);
        }

        // 긴 라인의 끝 개행 이후부터는 정상 라인
        append(&path, b"tail of the garbage\nrecovered\n");
        assert_eq!(drain(&mut follower).await, vec!["recovered"]);
        assert_eq!(follower.lines_read(), 2);
    }

    #[tokio::test]
    async fn line_at_max_length_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 1000)
            .await
            .unwrap()
            .with_max_line_length(8);

        append(&path, b"12345678\n123456789\nok\n");
        assert_eq!(
            drain(&mut follower).await,
            vec!["12345678".to_owned(), DECODE_ERROR_LINE.to_owned(), "ok".to_owned()]
        );
    }

    #[tokio::test]
    async fn truncation_reopens_at_new_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, &vec![b'x'; 50_000]);

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        assert_eq!(follower.recorded_size(), 50_000);

        // 서버가 로그를 새로 시작: 1200 바이트의 이전 내용은 전달되지 않아야 함
        let mut line = vec![b'y'; 1199];
        line.push(b'\n');
        std::fs::write(&path, &line).unwrap();

        assert!(follower.poll().await.unwrap().is_none());
        assert_eq!(follower.rotations(), 1);
        assert_eq!(follower.recorded_size(), 1200);

        append(&path, b"fresh\n");
        assert_eq!(drain(&mut follower).await, vec!["fresh"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rename_rotation_reopens_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"before\n");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();

        std::fs::rename(&path, dir.path().join("SquadGame-backup.log")).unwrap();
        append(&path, b"written before reopen\n");

        assert!(follower.poll().await.unwrap().is_none());
        assert_eq!(follower.rotations(), 1);

        append(&path, b"after rotation\n");
        assert_eq!(drain(&mut follower).await, vec!["after rotation"]);
    }

    #[tokio::test]
    async fn open_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");

        let err = LogFollower::open(&path, FAST, 1000).await.err().unwrap();
        assert!(matches!(err, LogMonitorError::Open { .. }));
    }

    #[tokio::test]
    async fn missing_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"content\n");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        // 경로 stat 실패는 일시적 에러로 취급
        assert!(follower.poll().await.unwrap().is_none());
        assert_eq!(follower.rotations(), 0);
    }

    #[tokio::test]
    async fn next_line_waits_for_new_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 1000).await.unwrap();
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            append(&writer_path, b"late line\n");
        });

        let line = tokio::time::timeout(Duration::from_secs(5), follower.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, "late line");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn size_is_refreshed_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SquadGame.log");
        append(&path, b"");

        let mut follower = LogFollower::open(&path, FAST, 2).await.unwrap();
        append(&path, b"a\nb\nc\n");

        // 1번째 라인에서 크기 기록 (6바이트), 3번째 라인에서 다시 기록
        assert_eq!(follower.poll().await.unwrap().as_deref(), Some("a"));
        assert_eq!(follower.recorded_size(), 6);
        append(&path, b"d\n");
        assert_eq!(follower.poll().await.unwrap().as_deref(), Some("b"));
        assert_eq!(follower.recorded_size(), 6);
        assert_eq!(follower.poll().await.unwrap().as_deref(), Some("c"));
        assert_eq!(follower.recorded_size(), 8);
    }
}
