//! 데미지 윈도우 -- 최근 데미지 통지를 보관하는 고정 크기 FIFO 버퍼
//!
//! 팀킬 통지는 가해자/피해자/무기 정보를 담고 있지 않으므로, 같은 로그 ID를 가진
//! 최근 데미지 통지를 이 윈도우에서 찾아 정보를 채웁니다.
//! 용량을 넘으면 가장 오래된 통지가 버려집니다.

use std::collections::VecDeque;

use tkwatch_core::types::LogId;

use crate::classifier::DamageNotification;
use crate::config::DEFAULT_DAMAGE_WINDOW_SIZE;

/// 최근 데미지 통지 윈도우
#[derive(Debug, Clone)]
pub struct DamageWindow {
    entries: VecDeque<DamageNotification>,
    capacity: usize,
    evicted: u64,
}

impl Default for DamageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DAMAGE_WINDOW_SIZE)
    }
}

impl DamageWindow {
    /// 지정한 용량의 윈도우를 생성합니다. 용량 0은 1로 취급합니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// 통지를 끝에 추가합니다. 용량을 넘으면 가장 오래된 통지를 버립니다.
    pub fn record(&mut self, damage: DamageNotification) {
        self.entries.push_back(damage);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
    }

    /// 주어진 로그 ID의 통지를 오래된 것부터 찾아 처음 일치한 것을 반환합니다.
    pub fn find(&self, log_id: LogId) -> Option<&DamageNotification> {
        self.entries.iter().find(|d| d.log_id == log_id)
    }

    /// 모든 통지를 비웁니다.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 보관 중인 통지 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 최대 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 용량 초과로 버려진 통지 수
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// 오래된 것부터 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &DamageNotification> {
        self.entries.iter()
    }
}
