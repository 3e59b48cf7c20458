//! 进程内通信实现
//!
//! 每个 rank 跑在自己的线程上，通过 crossbeam 通道互连：
//! - 跨 rank 消息：每个 rank 一个收件通道，所有 rank 共享其发送端；
//! - 集合通信：每个有序 rank 对一条 FIFO 通道，保证各轮次不会交错。

use super::comm::{CommError, Communicator, RemoteMessage};
use super::lbts::LbtsMessage;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::trace;

#[derive(Debug)]
enum Collective {
    Lbts(LbtsMessage),
    Max(u64),
}

/// 一个 rank 的进程内通信端点
#[derive(Debug)]
pub struct LocalComm {
    rank: u32,
    size: u32,
    data_tx: Vec<Sender<RemoteMessage>>,
    data_rx: Receiver<RemoteMessage>,
    coll_tx: Vec<Option<Sender<Collective>>>,
    coll_rx: Vec<Option<Receiver<Collective>>>,
    destroyed: bool,
}

/// 进程内集群构建器
pub struct LocalCluster;

impl LocalCluster {
    /// 创建 `size` 个互连的端点，下标即 rank 编号。
    pub fn new(size: u32) -> Vec<LocalComm> {
        assert!(size > 0, "cluster needs at least one rank");
        let n = size as usize;

        let (data_tx, data_rx): (Vec<Sender<RemoteMessage>>, Vec<Receiver<RemoteMessage>>) =
            (0..n).map(|_| unbounded()).unzip();

        let mut coll_tx: Vec<Vec<Option<Sender<Collective>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        let mut coll_rx: Vec<Vec<Option<Receiver<Collective>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        for from in 0..n {
            for to in 0..n {
                if from == to {
                    continue;
                }
                let (tx, rx) = unbounded();
                coll_tx[from][to] = Some(tx);
                coll_rx[to][from] = Some(rx);
            }
        }

        data_rx
            .into_iter()
            .zip(coll_tx)
            .zip(coll_rx)
            .enumerate()
            .map(|(rank, ((data_rx, coll_tx), coll_rx))| LocalComm {
                rank: rank as u32,
                size,
                data_tx: data_tx.clone(),
                data_rx,
                coll_tx,
                coll_rx,
                destroyed: false,
            })
            .collect()
    }
}

impl LocalComm {
    fn broadcast(&self, make: impl Fn() -> Collective) -> Result<(), CommError> {
        for (peer, tx) in self.coll_tx.iter().enumerate() {
            if let Some(tx) = tx {
                tx.send(make())
                    .map_err(|_| CommError::Disconnected(peer as u32))?;
            }
        }
        Ok(())
    }

    fn recv_from(&self, peer: usize) -> Result<Collective, CommError> {
        let rx = self.coll_rx[peer]
            .as_ref()
            .ok_or(CommError::UnknownRank {
                rank: peer as u32,
                size: self.size,
            })?;
        rx.recv().map_err(|_| CommError::Disconnected(peer as u32))
    }

    fn check_alive(&self) -> Result<(), CommError> {
        if self.destroyed {
            Err(CommError::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl Communicator for LocalComm {
    fn system_id(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn send(&mut self, msg: RemoteMessage) -> Result<(), CommError> {
        self.check_alive()?;
        let dst = msg.dst();
        if dst >= self.size || dst == self.rank {
            return Err(CommError::UnknownRank {
                rank: dst,
                size: self.size,
            });
        }
        trace!(src = self.rank, dst, rx_time = ?msg.rx_time(), "发送跨 rank 消息");
        self.data_tx[dst as usize]
            .send(msg)
            .map_err(|_| CommError::Disconnected(dst))
    }

    fn try_recv(&mut self) -> Result<Option<RemoteMessage>, CommError> {
        self.check_alive()?;
        match self.data_rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn all_gather(&mut self, local: LbtsMessage) -> Result<Vec<LbtsMessage>, CommError> {
        self.check_alive()?;
        self.broadcast(|| Collective::Lbts(local))?;
        let mut out = Vec::with_capacity(self.size as usize);
        for peer in 0..self.size as usize {
            if peer == self.rank as usize {
                out.push(local);
                continue;
            }
            match self.recv_from(peer)? {
                Collective::Lbts(m) => out.push(m),
                Collective::Max(_) => {
                    return Err(CommError::Protocol {
                        peer: peer as u32,
                        expected: "lbts summary",
                    });
                }
            }
        }
        Ok(out)
    }

    fn all_reduce_max(&mut self, value: u64) -> Result<u64, CommError> {
        self.check_alive()?;
        self.broadcast(|| Collective::Max(value))?;
        let mut max = value;
        for peer in 0..self.size as usize {
            if peer == self.rank as usize {
                continue;
            }
            match self.recv_from(peer)? {
                Collective::Max(v) => max = max.max(v),
                Collective::Lbts(_) => {
                    return Err(CommError::Protocol {
                        peer: peer as u32,
                        expected: "max reduction",
                    });
                }
            }
        }
        Ok(max)
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.data_tx.clear();
        self.coll_tx.clear();
    }
}
