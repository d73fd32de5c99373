//! # 時刻供給
//!
//! 失効判定とレコードのタイムスタンプに使う現在時刻（UNIXミリ秒）を抽象化する。
//! テストでは [`ManualClock`] で時刻を進めて失効を再現する。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 現在時刻（UNIXミリ秒）を返すトレイト。
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// システム時計。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // エポック以前の時刻は0に丸める
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// 手動で進める時計。テスト・シミュレーション用。
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// `start`（UNIXミリ秒）から始まる時計を作る。
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// 時刻を `now` に設定する。
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// 時刻を `millis` だけ進める。
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
