//! Fire-and-forget systemd readiness notifications.
//!
//! Speaks the `sd_notify` datagram protocol directly over `$NOTIFY_SOCKET`;
//! failures are logged at debug level and otherwise ignored, so running
//! outside systemd costs nothing.

#[cfg(unix)]
pub fn notify_ready() {
    notify("READY=1");
}

#[cfg(unix)]
pub fn notify_stopping() {
    notify("STOPPING=1");
}

#[cfg(unix)]
fn notify(state: &str) {
    use std::os::unix::net::UnixDatagram;
    use tracing::debug;

    let Ok(path) = std::env::var("NOTIFY_SOCKET") else {
        debug!("NOTIFY_SOCKET not set; skipping systemd notification");
        return;
    };

    let Ok(socket) = UnixDatagram::unbound() else {
        debug!("could not open a datagram socket for systemd notification");
        return;
    };

    let result = if let Some(abstract_name) = path.strip_prefix('@') {
        send_abstract(&socket, abstract_name, state)
    } else {
        socket.send_to(state.as_bytes(), &path).map(|_| ())
    };
    if let Err(e) = result {
        debug!(error = %e, "systemd notification failed");
    }
}

/// Abstract-namespace sockets (leading `@`) only exist on Linux.
#[cfg(target_os = "linux")]
fn send_abstract(
    socket: &std::os::unix::net::UnixDatagram,
    name: &str,
    state: &str,
) -> std::io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    socket.send_to_addr(state.as_bytes(), &addr).map(|_| ())
}

#[cfg(all(unix, not(target_os = "linux")))]
fn send_abstract(
    _socket: &std::os::unix::net::UnixDatagram,
    _name: &str,
    _state: &str,
) -> std::io::Result<()> {
    Err(std::io::Error::other(
        "abstract notify sockets are Linux-only",
    ))
}

#[cfg(not(unix))]
pub fn notify_ready() {}

#[cfg(not(unix))]
pub fn notify_stopping() {}
