use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::color::{ColorOrder, Rgb};
use crate::output::dim;
use crate::strip::StripDriver;

const UNIVERSE_SIZE: usize = 512;

/// Sends a strip as one DMX universe to the OSC plugin of an OLA daemon,
/// three channels per pixel.
pub struct OlaOutput {
    sock: UdpSocket,
    target_addr: SocketAddr,
    osc_addr: String,
    color_order: ColorOrder,
    brightness: u8,
    pixel_count: usize,
    buffer: Vec<u8>,
}

impl OlaOutput {
    pub fn new(
        target_addr: SocketAddr,
        universe: u16,
        pixel_count: usize,
        color_order: ColorOrder,
    ) -> Result<Self, String> {
        if pixel_count * 3 > UNIVERSE_SIZE {
            return Err(format!(
                "{pixel_count} pixels do not fit into one DMX universe"
            ));
        }

        let our_addr = if target_addr.is_ipv4() {
            SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0)
        } else {
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0)
        };
        let sock = match UdpSocket::bind(our_addr) {
            Ok(sock) => sock,
            Err(error) => return Err(error.to_string()),
        };

        Ok(OlaOutput {
            sock,
            target_addr,
            osc_addr: format!("/dmx/universe/{universe}"),
            color_order,
            brightness: 255,
            pixel_count,
            buffer: vec![0; UNIVERSE_SIZE],
        })
    }

    fn encode(&self) -> io::Result<Vec<u8>> {
        encoder::encode(&OscPacket::Message(OscMessage {
            addr: self.osc_addr.clone(),
            args: vec![OscType::Blob(self.buffer.clone())],
        }))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}")))
    }
}

impl StripDriver for OlaOutput {
    fn begin(&mut self) -> io::Result<()> {
        log::info!("Sending {} to {}", self.osc_addr, self.target_addr);
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        let channels = self.color_order.arrange(color);
        for (i, value) in channels.iter().enumerate() {
            self.buffer[index * 3 + i] = dim(*value, self.brightness);
        }
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn show(&mut self) -> io::Result<()> {
        let msg_buf = self.encode()?;
        self.sock.send_to(&msg_buf, self.target_addr)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_universe_blob() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut output =
            OlaOutput::new(receiver.local_addr().unwrap(), 3, 2, ColorOrder::Grb).unwrap();
        output.begin().unwrap();
        output.set_pixel(1, Rgb::new(10, 20, 30));
        output.show().unwrap();

        let mut buf = [0u8; rosc::decoder::MTU];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        let packet = rosc::decoder::decode(&buf[..size]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/dmx/universe/3");
                match &msg.args[0] {
                    OscType::Blob(data) => {
                        assert_eq!(data.len(), UNIVERSE_SIZE);
                        assert_eq!(&data[3..6], &[20, 10, 30]);
                    }
                    other => panic!("unexpected argument {other:?}"),
                }
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn rejects_strips_longer_than_a_universe() {
        let target = "127.0.0.1:7770".parse().unwrap();
        assert!(OlaOutput::new(target, 0, 171, ColorOrder::Rgb).is_err());
    }
}
