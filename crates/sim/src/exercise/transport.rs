use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

/// Broadcast datagram endpoint.
///
/// Neither call may block. Delivery is best effort and a sender usually
/// receives its own broadcasts back.
pub trait Transport {
    fn broadcast(&mut self, datagram: &[u8]) -> io::Result<usize>;

    /// Drains every datagram that arrived since the previous call.
    fn receive(&mut self) -> io::Result<Vec<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn broadcast(&mut self, datagram: &[u8]) -> io::Result<usize> {
        (**self).broadcast(datagram)
    }

    fn receive(&mut self) -> io::Result<Vec<Vec<u8>>> {
        (**self).receive()
    }
}

/// In-process broadcast segment shared by any number of [`MemoryTransport`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    inboxes: Rc<RefCell<Vec<VecDeque<Vec<u8>>>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self) -> MemoryTransport {
        let mut inboxes = self.inboxes.borrow_mut();
        inboxes.push(VecDeque::new());
        MemoryTransport {
            network: self.clone(),
            index: inboxes.len() - 1,
        }
    }

    /// Delivers `datagram` to every endpoint, as if sent by a foreign host.
    pub fn inject(&self, datagram: &[u8]) {
        for inbox in self.inboxes.borrow_mut().iter_mut() {
            inbox.push_back(datagram.to_vec());
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    index: usize,
}

impl MemoryTransport {
    pub fn pending(&self) -> usize {
        self.network
            .inboxes
            .borrow()
            .get(self.index)
            .map_or(0, VecDeque::len)
    }
}

impl Transport for MemoryTransport {
    fn broadcast(&mut self, datagram: &[u8]) -> io::Result<usize> {
        self.network.inject(datagram);
        Ok(datagram.len())
    }

    fn receive(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let mut inboxes = self.network.inboxes.borrow_mut();
        let inbox = inboxes
            .get_mut(self.index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "endpoint left the network"))?;
        Ok(inbox.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_endpoint() {
        let network = MemoryNetwork::new();
        let mut a = network.endpoint();
        let mut b = network.endpoint();

        assert_eq!(a.broadcast(b"hello").unwrap(), 5);
        assert_eq!(a.pending(), 1);
        assert_eq!(b.receive().unwrap(), vec![b"hello".to_vec()]);
        assert!(b.receive().unwrap().is_empty());
        assert_eq!(a.receive().unwrap().len(), 1);
    }

    #[test]
    fn test_receive_preserves_order() {
        let network = MemoryNetwork::new();
        let mut endpoint = network.endpoint();
        network.inject(&[1]);
        network.inject(&[2]);
        network.inject(&[3]);
        assert_eq!(endpoint.receive().unwrap(), vec![vec![1], vec![2], vec![3]]);
    }
}
