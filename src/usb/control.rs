//! Vendor control requests
//!
//! Decodes vendor requests on endpoint 0 into [`Command`]s and hands them to
//! whatever owns the transceiver core. USB resets and configuration changes
//! are forwarded too, since they end any stream the host had running.

use embassy_usb::control::{InResponse, OutResponse, Request, RequestType};
use embassy_usb::Handler;

use crate::error::{Error, Result};
use crate::radio::command::{Command, Response};

/// Receiver of decoded host commands
pub trait CommandSink {
    /// Run one command
    fn execute(&mut self, command: Command) -> Result<Response>;

    /// The device was reset, configured or deconfigured
    fn usb_configuration_changed(&mut self, configured: bool);
}

/// `embassy-usb` handler for the vendor request set
pub struct VendorHandler<S> {
    sink: S,
}

impl<S: CommandSink> VendorHandler<S> {
    /// Handler forwarding to `sink`
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    fn run(&mut self, req: &Request) -> Option<Result<Response>> {
        if req.request_type != RequestType::Vendor {
            return None;
        }
        let Some(command) = Command::from_vendor_request(req.request, req.value, req.index) else {
            warn!("usb: unknown vendor request {=u8}", req.request);
            return Some(Err(Error::UnsupportedRequest(req.request)));
        };
        debug!("usb: {}", command);
        Some(self.sink.execute(command))
    }
}

impl<S: CommandSink> Handler for VendorHandler<S> {
    fn reset(&mut self) {
        self.sink.usb_configuration_changed(false);
    }

    fn configured(&mut self, configured: bool) {
        self.sink.usb_configuration_changed(configured);
    }

    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        match self.run(&req)? {
            Ok(_) => Some(OutResponse::Accepted),
            Err(err) => {
                warn!("usb: request {=u8} failed: {}", req.request, err);
                Some(OutResponse::Rejected)
            }
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        match self.run(&req)? {
            Ok(response) => {
                let len = match response.data_stage() {
                    Some(data) => {
                        let len = data.len().min(buf.len()).min(usize::from(req.length));
                        buf[..len].copy_from_slice(&data[..len]);
                        len
                    }
                    None => 0,
                };
                Some(InResponse::Accepted(&buf[..len]))
            }
            Err(err) => {
                warn!("usb: request {=u8} failed: {}", req.request, err);
                Some(InResponse::Rejected)
            }
        }
    }
}
