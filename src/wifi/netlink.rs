//! Dedicated OS thread monitoring IPv4 address changes on the
//! provisioning Wi-Fi interface via `NETLINK_ROUTE` (spec §4.9).
//!
//! This is the one place in the daemon that does not go through
//! D-Bus: NetworkManager's own IPv4-ready signal can lag the kernel by
//! a noticeable amount right after DHCP completes, so we watch the
//! interface address table directly instead.

use std::ffi::CString;
use std::sync::mpsc::Sender;
use std::thread;

use neli::consts::rtnl::{Ifa, RtAddrFamily, Rtm};
use neli::consts::socket::NlFamily;
use neli::nl::{NlPayload, Nlmsghdr};
use neli::rtnl::Ifaddrmsg;
use neli::socket::NlSocketHandle;
use neli::types::{Buffer, RtBuffer};

use crate::dispatcher::DispatchEvent;

/// `RTNLGRP_IPV4_IFADDR`: the multicast group carrying `RTM_NEWADDR` /
/// `RTM_DELADDR` notifications for IPv4 addresses. neli's socket groups
/// are `RTNLGRP_*` group *numbers* joined via `NETLINK_ADD_MEMBERSHIP`,
/// not the legacy `RTMGRP_*` bitmask passed to a raw `bind(2)` call —
/// the group number for IPv4 address changes is 5.
const RTNLGRP_IPV4_IFADDR: u32 = 5;

/// Resolves an interface name to its kernel ifindex via `if_nametoindex(3)`.
/// Returns `None` if the interface does not currently exist.
pub fn resolve_if_index(iface: &str) -> Option<u32> {
    let cname = CString::new(iface).ok()?;
    let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if index == 0 {
        None
    } else {
        Some(index)
    }
}

/// Spawns the monitor thread. `if_index` is resolved once at startup
/// and never re-resolved (spec §4.9: the daemon does not handle the
/// watched interface disappearing and reappearing under a new index).
pub fn spawn(if_index: u32, events_tx: Sender<DispatchEvent>) {
    thread::spawn(move || {
        if let Err(err) = run(if_index, &events_tx) {
            log::error!("netlink monitor thread exited: {}", err);
        }
    });
}

fn run(if_index: u32, events_tx: &Sender<DispatchEvent>) -> Result<(), neli::err::NlError> {
    let mut socket = NlSocketHandle::connect(NlFamily::Route, None, &[RTNLGRP_IPV4_IFADDR])?;

    loop {
        let messages = socket.recv::<Rtm, Ifaddrmsg>()?;
        for msg in messages {
            handle_message(if_index, msg, events_tx);
        }
    }
}

fn handle_message(if_index: u32, msg: Nlmsghdr<Rtm, Ifaddrmsg>, events_tx: &Sender<DispatchEvent>) {
    let payload = match msg.nl_payload {
        NlPayload::Payload(p) => p,
        _ => return,
    };

    if payload.ifa_family != RtAddrFamily::Inet {
        return;
    }
    if payload.ifa_index as u32 != if_index {
        return;
    }

    match msg.nl_type {
        Rtm::Newaddr => {
            if let Some(address) = extract_address(&payload.rtattrs) {
                log::info!("ipv4 address assigned: {}", address);
                let _ = events_tx.send(DispatchEvent::Ipv4Ready { address });
            }
        }
        Rtm::Deladdr => {
            log::info!("ipv4 address removed");
            let _ = events_tx.send(DispatchEvent::Ipv4Removed);
        }
        _ => {}
    }
}

fn extract_address(attrs: &RtBuffer<Ifa, Buffer>) -> Option<String> {
    attrs.iter().find_map(|attr| {
        if attr.rta_type != Ifa::Local && attr.rta_type != Ifa::Address {
            return None;
        }
        let bytes = attr.rta_payload.as_ref();
        if bytes.len() == 4 {
            Some(format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3]))
        } else {
            None
        }
    })
}
