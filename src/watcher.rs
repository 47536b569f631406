/// 外部变更监听
///
/// `DirectoryWatcher` 用 notify 监听资源组所在目录，只上报资源文件的变更；
/// `ReloadDebouncer` 把短时间内的多次变更合并为一次重新加载。
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::resx::is_resource_file;
use crate::utils::ResxError;

/// 默认去抖窗口
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// 一次外部变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// 事件发生的时间（在监听线程中记录，而不是被拉取的时间）
    pub at: Instant,
    /// 涉及的资源文件
    pub paths: Vec<PathBuf>,
}

/// 目录监听器
///
/// 监听器在被 drop 时停止。事件经 mpsc 通道送达，由调用方线程主动拉取。
pub struct DirectoryWatcher {
    directory: PathBuf,
    // 必须持有，否则监听立即停止
    _watcher: RecommendedWatcher,
    rx: Receiver<(Instant, notify::Result<Event>)>,
}

impl DirectoryWatcher {
    /// 开始监听目录（不递归，资源组的文件都在同一目录下）
    pub fn watch(directory: &Path) -> Result<Self, ResxError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // 接收端已经 drop 时监听器也即将停止
            let _ = tx.send((Instant::now(), res));
        })?;
        watcher.watch(directory, RecursiveMode::NonRecursive)?;
        log::debug!("开始监听 {:?}", directory);

        Ok(Self {
            directory: directory.to_path_buf(),
            _watcher: watcher,
            rx,
        })
    }

    /// 取出下一个与资源文件有关的事件（不阻塞）
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        next_change(&self.rx)
    }

    /// 取出当前积压的全部事件
    pub fn drain(&self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

fn next_change(rx: &Receiver<(Instant, notify::Result<Event>)>) -> Option<ChangeEvent> {
    loop {
        match rx.try_recv() {
            Ok((at, Ok(event))) => {
                if let Some(change) = to_change(event, at) {
                    return Some(change);
                }
            }
            Ok((_, Err(e))) => log::warn!("监听错误: {}", e),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        }
    }
}

/// 过滤掉访问事件和非资源文件
fn to_change(event: Event, at: Instant) -> Option<ChangeEvent> {
    if matches!(event.kind, EventKind::Access(_)) {
        return None;
    }
    let paths: Vec<PathBuf> = event.paths.into_iter().filter(|p| is_resource_file(p)).collect();
    if paths.is_empty() {
        return None;
    }
    Some(ChangeEvent { at, paths })
}

/// 重新加载去抖器
///
/// 每个新事件都会重新开始计时；距最后一个事件满一个窗口后 `poll` 才返回 true，
/// 且每批事件只返回一次。时间由调用方传入，便于测试。
#[derive(Debug, Clone)]
pub struct ReloadDebouncer {
    window: Duration,
    last_event: Option<Instant>,
}

impl ReloadDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_event: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 记录一次事件（取消并重启计时）
    pub fn record(&mut self, at: Instant) {
        self.last_event = Some(at);
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// 预定的重新加载时间
    pub fn deadline(&self) -> Option<Instant> {
        self.last_event.map(|at| at + self.window)
    }

    /// 到期则消费本批事件并返回 true
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ReloadDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};

    #[test]
    fn test_events_are_coalesced() {
        let t0 = Instant::now();
        let mut debouncer = ReloadDebouncer::default();

        debouncer.record(t0);
        debouncer.record(t0 + Duration::from_millis(100));

        assert!(!debouncer.poll(t0 + Duration::from_millis(500)));
        assert!(!debouncer.poll(t0 + Duration::from_millis(599)));
        assert!(debouncer.poll(t0 + Duration::from_millis(600)));
        assert!(!debouncer.poll(t0 + Duration::from_millis(2000)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_events_keep_the_time_they_happened() {
        let (tx, rx) = mpsc::channel();
        let happened = Instant::now();
        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("a/Strings.resx"));
        tx.send((happened, Ok(event))).unwrap();
        tx.send((happened, Err(notify::Error::generic("lost")))).unwrap();

        // 晚一分钟才拉取，窗口仍从事件发生时算起
        let drained_at = happened + Duration::from_secs(60);
        let change = next_change(&rx).unwrap();
        assert_eq!(change.at, happened);
        assert!(next_change(&rx).is_none());

        let mut debouncer = ReloadDebouncer::default();
        debouncer.record(change.at);
        assert!(debouncer.poll(drained_at));
    }

    #[test]
    fn test_event_filtering() {
        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(PathBuf::from("a/Strings.resx"));
        assert!(to_change(access, Instant::now()).is_none());

        let other = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("a/notes.txt"));
        assert!(to_change(other, Instant::now()).is_none());

        let change = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("a/notes.txt"))
            .add_path(PathBuf::from("a/Strings.de.resx"));
        assert_eq!(to_change(change, Instant::now()).unwrap().paths, vec![PathBuf::from("a/Strings.de.resx")]);
    }
}
