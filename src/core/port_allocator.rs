use crate::domain::ports::ContainerRuntime;
use crate::utils::error::AllocationError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub const BASE_PORT: u16 = 59000;

// `0.0.0.0:59000->27017/tcp`、範圍 `0.0.0.0:59000-59002->27017-27019/tcp` 取第一個埠
static HOST_PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(\d+)(?:-\d+)?->").expect("host port pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Pending,
    Committed(Instant),
}

type ClaimTable = Arc<Mutex<HashMap<u16, Claim>>>;

fn lock_claims(claims: &Mutex<HashMap<u16, Claim>>) -> MutexGuard<'_, HashMap<u16, Claim>> {
    claims.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 從 `docker ps --format {{.Ports}}` 的輸出取出所有主機端埠
pub fn extract_host_ports(listing: &str) -> Vec<String> {
    HOST_PORT_PATTERN
        .captures_iter(listing)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// 以字典序取最後一個埠再加一；沒有任何埠時回傳 `base`
pub fn next_port(ports: &[String], base: u16) -> Result<u16, AllocationError> {
    let Some(last) = ports.iter().max() else {
        return Ok(base);
    };

    let successor = last
        .parse::<u32>()
        .ok()
        .and_then(|port| port.checked_add(1))
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| AllocationError::Exhausted { last: last.clone() })?;

    Ok(successor.max(base))
}

/// 一個已預留但尚未被執行環境確認的埠
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    claims: ClaimTable,
    committed: bool,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 容器建立成功後呼叫；預留會保留到下一次在此之後開始的掃描
    pub fn commit(mut self) {
        lock_claims(&self.claims).insert(self.port, Claim::Committed(Instant::now()));
        self.committed = true;
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        if !self.committed {
            let mut claims = lock_claims(&self.claims);
            if claims.get(&self.port) == Some(&Claim::Pending) {
                claims.remove(&self.port);
            }
        }
    }
}

/// 依執行環境目前發布的埠推算下一個埠；已發出但執行環境尚未列出的埠記在預留表中
pub struct PortAllocator<R: ContainerRuntime> {
    runtime: Arc<R>,
    base_port: u16,
    claims: ClaimTable,
}

impl<R: ContainerRuntime> PortAllocator<R> {
    pub fn new(runtime: Arc<R>, base_port: u16) -> Self {
        Self {
            runtime,
            base_port,
            claims: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 計算下一個可用埠並預留它，跳過執行環境已使用或其他請求已預留的埠
    pub async fn allocate(&self) -> Result<PortLease, AllocationError> {
        let scan_started = Instant::now();
        let listing = self.runtime.published_ports().await?;
        let observed = extract_host_ports(&listing);
        let mut candidate = next_port(&observed, self.base_port)?;

        let in_use: HashSet<u16> = observed.iter().filter_map(|p| p.parse().ok()).collect();

        let mut claims = lock_claims(&self.claims);
        // 掃描開始前確認的預留已經反映在執行環境狀態中
        claims.retain(|_, claim| match claim {
            Claim::Pending => true,
            Claim::Committed(at) => *at > scan_started,
        });

        while in_use.contains(&candidate) || claims.contains_key(&candidate) {
            candidate = candidate
                .checked_add(1)
                .ok_or_else(|| AllocationError::Exhausted {
                    last: candidate.to_string(),
                })?;
        }

        claims.insert(candidate, Claim::Pending);
        tracing::debug!(
            port = candidate,
            observed = observed.len(),
            claimed = claims.len(),
            "reserved host port"
        );

        Ok(PortLease {
            port: candidate,
            claims: Arc::clone(&self.claims),
            committed: false,
        })
    }

    #[cfg(test)]
    fn claimed_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = lock_claims(&self.claims).keys().copied().collect();
        ports.sort_unstable();
        ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ContainerSpec;
    use crate::utils::error::RuntimeError;
    use async_trait::async_trait;

    struct ListingRuntime {
        listing: Mutex<String>,
        fail: bool,
    }

    impl ListingRuntime {
        fn new(listing: &str) -> Self {
            Self {
                listing: Mutex::new(listing.to_string()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                listing: Mutex::new(String::new()),
                fail: true,
            }
        }

        fn set_listing(&self, listing: &str) {
            *self.listing.lock().unwrap() = listing.to_string();
        }
    }

    #[async_trait]
    impl ContainerRuntime for ListingRuntime {
        async fn published_ports(&self) -> Result<String, RuntimeError> {
            if self.fail {
                return Err(RuntimeError::CommandFailed {
                    command: "docker ps".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "Cannot connect to the Docker daemon".to_string(),
                });
            }
            Ok(self.listing.lock().unwrap().clone())
        }

        async fn run_container(&self, _spec: &ContainerSpec) -> Result<(), RuntimeError> {
            Ok(())
        }

        async fn remove_container(&self, _name: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    fn ports(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_extract_host_ports() {
        let listing = "0.0.0.0:59000->27017/tcp, :::59000->27017/tcp\n\
                       0.0.0.0:59001->27017/tcp\n\
                       \n\
                       27017/tcp\n";
        assert_eq!(
            extract_host_ports(listing),
            ports(&["59000", "59000", "59001"])
        );
        assert!(extract_host_ports("").is_empty());

        let ranged = "0.0.0.0:59000-59002->27017-27019/tcp, :::59000-59002->27017-27019/tcp";
        assert_eq!(extract_host_ports(ranged), ports(&["59000", "59000"]));
    }

    #[test]
    fn test_next_port_without_published_ports_is_base() {
        assert_eq!(next_port(&[], BASE_PORT).unwrap(), 59000);
    }

    #[test]
    fn test_next_port_is_successor_of_last() {
        assert_eq!(
            next_port(&ports(&["59000", "59001", "59010"]), BASE_PORT).unwrap(),
            59011
        );
    }

    #[test]
    fn test_next_port_compares_lexicographically() {
        // "59009" > "590010" 以字串比較，所以結果是 59010 而不是 590011
        assert_eq!(
            next_port(&ports(&["59009", "590010"]), BASE_PORT).unwrap(),
            59010
        );
        assert_eq!(
            next_port(&ports(&["59999", "60000", "9000"]), BASE_PORT).unwrap(),
            59000
        );
    }

    #[test]
    fn test_next_port_never_below_base() {
        assert_eq!(next_port(&ports(&["8080"]), BASE_PORT).unwrap(), 59000);
    }

    #[test]
    fn test_next_port_exhausted() {
        assert!(matches!(
            next_port(&ports(&["65535"]), BASE_PORT),
            Err(AllocationError::Exhausted { .. })
        ));
    }

    #[tokio::test]
    async fn test_runtime_failure_is_query_error() {
        let allocator = PortAllocator::new(Arc::new(ListingRuntime::failing()), BASE_PORT);
        assert!(matches!(
            allocator.allocate().await,
            Err(AllocationError::Query(_))
        ));
        assert!(allocator.claimed_ports().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_leases_get_distinct_ports() {
        let allocator = PortAllocator::new(
            Arc::new(ListingRuntime::new("0.0.0.0:59000->27017/tcp\n")),
            BASE_PORT,
        );

        let first = allocator.allocate().await.unwrap();
        let second = allocator.allocate().await.unwrap();
        assert_eq!(first.port(), 59001);
        assert_eq!(second.port(), 59002);
        assert_eq!(allocator.claimed_ports(), vec![59001, 59002]);
    }

    #[tokio::test]
    async fn test_dropped_lease_is_released() {
        let allocator = PortAllocator::new(Arc::new(ListingRuntime::new("")), BASE_PORT);

        let lease = allocator.allocate().await.unwrap();
        assert_eq!(lease.port(), 59000);
        drop(lease);

        assert!(allocator.claimed_ports().is_empty());
        assert_eq!(allocator.allocate().await.unwrap().port(), 59000);
    }

    #[tokio::test]
    async fn test_committed_lease_pruned_once_runtime_reports_it() {
        let runtime = Arc::new(ListingRuntime::new(""));
        let allocator = PortAllocator::new(Arc::clone(&runtime), BASE_PORT);

        allocator.allocate().await.unwrap().commit();
        assert_eq!(allocator.claimed_ports(), vec![59000]);

        runtime.set_listing("0.0.0.0:59000->27017/tcp\n");
        let lease = allocator.allocate().await.unwrap();
        assert_eq!(lease.port(), 59001);
        assert_eq!(allocator.claimed_ports(), vec![59001]);
    }

    #[tokio::test]
    async fn test_skips_observed_port_after_clamping() {
        let allocator = PortAllocator::new(
            Arc::new(ListingRuntime::new(
                "0.0.0.0:9000->27017/tcp\n0.0.0.0:59000->27017/tcp\n",
            )),
            BASE_PORT,
        );
        assert_eq!(allocator.allocate().await.unwrap().port(), 59001);
    }
}
