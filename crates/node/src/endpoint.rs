use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use dissim::Transport;

const MAX_DATAGRAM_SIZE: usize = 8192;

/// Non-blocking UDP socket that sends every datagram to one broadcast address.
pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    broadcast_addr: SocketAddr,
    recv_buffer: Box<[u8; MAX_DATAGRAM_SIZE]>,
}

impl UdpEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A, broadcast_addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            broadcast_addr,
            recv_buffer: Box::new([0u8; MAX_DATAGRAM_SIZE]),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn broadcast_addr(&self) -> SocketAddr {
        self.broadcast_addr
    }
}

impl Transport for UdpEndpoint {
    fn broadcast(&mut self, datagram: &[u8]) -> io::Result<usize> {
        if datagram.len() > MAX_DATAGRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "datagram exceeds maximum size",
            ));
        }
        self.socket.send_to(datagram, self.broadcast_addr)
    }

    fn receive(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let mut datagrams = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer[..]) {
                Ok((size, _)) => datagrams.push(self.recv_buffer[..size].to_vec()),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        Ok(datagrams)
    }
}
