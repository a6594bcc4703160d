//! HTTP server task for the kiosk web surface.
//!
//! One connection at a time, mirroring the booth's actual load: a phone
//! and maybe a staff laptop. Each request is answered from a response
//! buffer owned by this task, written through `write_all` (which suspends
//! while the send window drains), then the connection is closed; every
//! response carries `Connection: close`.

use defmt::{debug, warn};
use embassy_net::Stack;
use embassy_net::tcp::TcpSocket;
use embassy_time::Duration;
use embedded_io_async::Write as _;
use heapless::String;
use theralink_common::config::HTTP_PORT;
use theralink_common::telemetry;
use theralink_pico2w::httpd::{self, Route};
use theralink_pico2w::pages;

use crate::shared::SharedKiosk;

const HDR_HTML: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n";
const HDR_JSON: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=UTF-8\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n";
const HDR_CSV: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/csv; charset=UTF-8\r\nContent-Disposition: attachment; filename=\"theralink_data.csv\"\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n";
const REDIRECT_DISPLAY: &str =
    "HTTP/1.1 303 See Other\r\nLocation: /display\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n";

#[embassy_executor::task]
pub async fn http_task(
    stack: Stack<'static>,
    kiosk: &'static SharedKiosk,
) -> ! {
    let mut rx_buf = [0u8; 2048];
    let mut tx_buf = [0u8; 2048];
    let mut req = [0u8; 1024];

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(Duration::from_secs(5)));

        if let Err(e) = socket.accept(HTTP_PORT).await {
            warn!("HTTP accept failed: {:?}", e);
            continue;
        }

        // GETs fit in one segment; the request line is all that matters.
        let n = match socket.read(&mut req).await {
            Ok(0) | Err(_) => {
                socket.abort();
                continue;
            }
            Ok(n) => n,
        };
        let route = httpd::route(core::str::from_utf8(&req[..n]).unwrap_or(""));
        debug!("HTTP {:?}", defmt::Debug2Format(&route));

        if serve(&mut socket, route, kiosk).await.is_ok() {
            let _ = socket.flush().await;
        }
        socket.close();
    }
}

async fn serve(
    socket: &mut TcpSocket<'_>,
    route: Route,
    kiosk: &SharedKiosk,
) -> Result<(), embassy_net::tcp::Error> {
    match route {
        Route::Dashboard => {
            socket.write_all(HDR_HTML.as_bytes()).await?;
            socket.write_all(pages::DASHBOARD_HTML.as_bytes()).await
        }
        Route::DisplayMirror => {
            socket.write_all(HDR_HTML.as_bytes()).await?;
            socket.write_all(pages::DISPLAY_HTML.as_bytes()).await
        }
        Route::Survey => {
            let open = kiosk.lock(|c| c.borrow().survey.mode());
            let page = if open { pages::SURVEY_FORM_HTML } else { pages::SURVEY_CLOSED_HTML };
            socket.write_all(HDR_HTML.as_bytes()).await?;
            socket.write_all(page.as_bytes()).await
        }
        Route::SurveySubmit(bits) => {
            match bits {
                Some(bits) => {
                    let token = kiosk.lock(|c| c.borrow_mut().survey.submit(bits));
                    debug!("survey submission, token {}", token);
                }
                // Malformed answer string: redirect with no state change.
                None => warn!("malformed survey submission"),
            }
            socket.write_all(REDIRECT_DISPLAY.as_bytes()).await
        }
        Route::SurveyStateJson => {
            let mut body: String<32> = String::new();
            let mode = kiosk.lock(|c| c.borrow().survey.mode());
            let _ = telemetry::write_survey_state_json(&mut body, mode);
            socket.write_all(HDR_JSON.as_bytes()).await?;
            socket.write_all(body.as_bytes()).await
        }
        Route::OledJson => {
            let mut body: String<256> = String::new();
            kiosk.lock(|c| {
                let k = c.borrow();
                let _ = telemetry::write_oled_json(&mut body, k.display.lines());
            });
            socket.write_all(HDR_JSON.as_bytes()).await?;
            socket.write_all(body.as_bytes()).await
        }
        Route::StatsJson(filter) => {
            let mut body: String<2048> = String::new();
            kiosk.lock(|c| {
                let k = c.borrow();
                let snap = k.stats.snapshot(filter);
                let _ = telemetry::write_stats_json(&mut body, &snap, k.survey.agg(filter));
            });
            socket.write_all(HDR_JSON.as_bytes()).await?;
            socket.write_all(body.as_bytes()).await
        }
        Route::DownloadCsv => {
            let mut body = [0u8; 512];
            let len = kiosk.lock(|c| c.borrow().stats.dump_csv(&mut body));
            socket.write_all(HDR_CSV.as_bytes()).await?;
            socket.write_all(&body[..len]).await
        }
    }
}
