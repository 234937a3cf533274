//! In-process fake of the portal's `mgrqispi.dll` endpoint.

#![allow(dead_code)]

use axum::extract::{Form, RawQuery, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use dualis_crawler::dualis::{Course, CrawlConfig, Credentials, Examination};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub const PORTAL_PATH: &str = "/scripts/mgrqispi.dll";
pub const USERNAME: &str = "s201808@student.example.org";
pub const PASSWORD: &str = "correct horse";
const SESSION_ID: &str = "ABC123";

/// Knobs for misbehaving portal variants.
#[derive(Default)]
pub struct Portal {
    /// Detail pages answer slower the earlier they appear, so unordered
    /// concurrent collection would come back reversed.
    pub staggered_details: AtomicBool,
    /// Detail pages never answer in time.
    pub hang_details: AtomicBool,
    /// Start page lacks the grade results navigation link.
    pub drop_grade_link: AtomicBool,
    /// The first N entry page requests stall.
    pub stall_entry_requests: AtomicUsize,
    pub entry_hits: AtomicUsize,
    pub detail_hits: AtomicUsize,
}

impl Portal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

pub fn crawl_config(base_url: Url) -> CrawlConfig {
    CrawlConfig {
        base_url,
        request_timeout: Duration::from_secs(5),
        crawl_timeout: Duration::from_secs(20),
        max_retries: 0,
        retry_backoff: Duration::from_millis(10),
        concurrency: 1,
    }
}

/// Start the fake portal on an ephemeral port and return its base URL.
pub async fn spawn_portal(portal: Arc<Portal>) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route(PORTAL_PATH, get(portal_get).post(portal_login))
        .with_state(portal);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Courses the fixture pages describe, in crawl order.
pub fn expected_courses() -> Vec<Course> {
    let exam = |exam_type: &str, grade: &str| Examination {
        exam_type: exam_type.into(),
        grade: grade.into(),
    };
    vec![
        Course {
            name: "Algorithms I".into(),
            examinations: vec![exam("Written Exam", "1.7")],
        },
        Course {
            name: "T3INF1002 Theoretische Informatik<br>".into(),
            examinations: vec![exam("Klausur (60%)", "2.3"), exam("Projekt (40%)", "1.3")],
        },
        Course {
            name: "Databases".into(),
            examinations: vec![exam("Seminar", "")],
        },
    ]
}

fn query_arg<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn authenticated(headers: &HeaderMap) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .any(|c| c.trim() == format!("cnsc={SESSION_ID}"))
}

async fn portal_login(
    State(_portal): State<Arc<Portal>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let hidden_ok = form.get("APPNAME").map(String::as_str) == Some("CampusNet")
        && form.get("PRGNAME").map(String::as_str) == Some("LOGINCHECK")
        && form.get("menu_type").map(String::as_str) == Some("classic");
    let creds_ok = form.get("usrname").map(String::as_str) == Some(USERNAME)
        && form.get("pass").map(String::as_str) == Some(PASSWORD);

    if !(hidden_ok && creds_ok) {
        return Html("<html><body><h1>Benutzername oder Passwort falsch</h1></body></html>")
            .into_response();
    }

    (
        [
            (SET_COOKIE, format!("SID={SESSION_ID}; Path=/")),
            (
                HeaderName::from_static("refresh"),
                format!("0; URL={PORTAL_PATH}?APPNAME=CampusNet&PRGNAME=STARTPAGE_DISPATCH&ARGUMENTS=-N777,-N000019"),
            ),
        ],
        Html("<html><body>Login OK</body></html>"),
    )
        .into_response()
}

async fn portal_get(
    State(portal): State<Arc<Portal>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let query = query.unwrap_or_default();
    let program = query_arg(&query, "PRGNAME").unwrap_or_default();

    if program == "EXTERNALPAGES" {
        portal.entry_hits.fetch_add(1, Ordering::SeqCst);
        let stall = portal.stall_entry_requests.load(Ordering::SeqCst);
        if stall > 0 {
            portal.stall_entry_requests.fetch_sub(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        return Html(LOGIN_PAGE).into_response();
    }

    if !authenticated(&headers) {
        return Html("<html><body>Zugang verweigert</body></html>").into_response();
    }

    let arguments: Vec<&str> = query_arg(&query, "ARGUMENTS")
        .unwrap_or_default()
        .split(',')
        .filter(|a| !a.is_empty())
        .collect();

    let body = match program {
        "STARTPAGE_DISPATCH" => format!(
            "<html><head><script>var x = 1;</script>\n\
             <!-- redirect --> <meta http-equiv=\"refresh\" content=\"0; URL={PORTAL_PATH}?APPNAME=CampusNet&PRGNAME=MLSSTART&ARGUMENTS=-N777,-N000019,\">\
             </head></html>"
        ),
        "MLSSTART" => start_page(portal.drop_grade_link.load(Ordering::SeqCst)),
        "COURSERESULTS" if arguments.len() >= 3 => {
            semester_listing(arguments[2].trim_start_matches("-N"))
        }
        "COURSERESULTS" => OVERVIEW_PAGE.to_owned(),
        "RESULTDETAILS" => {
            portal.detail_hits.fetch_add(1, Ordering::SeqCst);
            let id: u64 = arguments
                .last()
                .map(|a| a.trim_start_matches("-N"))
                .and_then(|a| a.parse().ok())
                .unwrap_or(0);
            if portal.hang_details.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if portal.staggered_details.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(300u64.saturating_sub(id * 100))).await;
            }
            detail_page(id)
        }
        _ => "<html><body>unknown</body></html>".to_owned(),
    };
    Html(body).into_response()
}

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<form id="cn_loginForm" action="/scripts/mgrqispi.dll" method="post">
  <input type="text" name="usrname" id="field_user" value="" />
  <input type="password" name="pass" id="field_pass" value="" />
  <input name="APPNAME" type="hidden" value="CampusNet" />
  <input name="PRGNAME" type="hidden" value="LOGINCHECK" />
  <input value="clino,usrname,pass,menuno,menu_type,browser,platform" name="ARGUMENTS" type="hidden" />
  <input name="clino" type="hidden" value="000000000000001" />
  <input type="hidden" name="menuno" value="000324" />
  <input type="hidden" value="classic" name="menu_type" />
  <input name="browser" type="hidden" value="" />
  <input name="platform" type="hidden" value="" />
</form>
</body></html>"#;

fn start_page(drop_grade_link: bool) -> String {
    let results = if drop_grade_link {
        String::new()
    } else {
        format!(
            r#"<li><a class="depth_1 link000307 navLink " href="{PORTAL_PATH}?APPNAME=CampusNet&amp;PRGNAME=COURSERESULTS&amp;ARGUMENTS=-N777,-N000307,">Prüfungsergebnisse</a></li>"#
        )
    };
    format!(
        r#"<html><body><ul id="pageTopNavi">
        <li><a class="depth_1 link000019 navLink " href="/home">Startseite</a></li>
        <li><a class="depth_1 link000306 navLink " href="/schedule">Veranstaltungen</a></li>
        {results}
        </ul></body></html>"#
    )
}

const OVERVIEW_PAGE: &str = r#"<html><body>
<form id="semesterchange">
  <select id="semester" name="semester">
    <option value="03">WiSe 2019/20</option>
    <option value="04" selected="selected">SoSe 2020</option>
  </select>
</form>
</body></html>"#;

fn result_row(id: u64) -> String {
    format!(
        r#"<tr>
        <td class="tbdata">T3INF100{id}</td>
        <td class="tbdata">Course {id}</td>
        <td class="tbdata_numeric">5,0</td>
        <td class="tbdata"><script type="text/javascript">
            dl_popUp("{PORTAL_PATH}?APPNAME=CampusNet&PRGNAME=RESULTDETAILS&ARGUMENTS=-N777,-N000307,-N{id}","Resultdetails",768,768,"yes");
        </script></td>
        </tr>"#
    )
}

fn semester_listing(semester: &str) -> String {
    let rows = match semester {
        "03" => [result_row(1), result_row(2)].concat(),
        "04" => format!(
            r#"{}<tr><td class="tbdata" colspan="3">Semester-GPA</td><td class="tbdata">1,9</td></tr>"#,
            result_row(3)
        ),
        _ => String::new(),
    };
    format!(
        r#"<html><body><table class="nb list">
        <tr><th class="tbhead">Nr.</th><th class="tbhead">Name</th></tr>
        {rows}
        </table></body></html>"#
    )
}

fn detail_page(id: u64) -> String {
    let (heading, rows) = match id {
        1 => ("Algorithms I", vec![("Written Exam", "1.7")]),
        2 => (
            "T3INF1002 Theoretische Informatik<br>",
            vec![("Klausur (60%)", "2.3"), ("Projekt (40%)", "1.3")],
        ),
        3 => ("Databases", vec![("Seminar", "")]),
        _ => ("Unknown", vec![]),
    };
    let rows: String = rows
        .iter()
        .map(|(exam_type, grade)| {
            format!(
                "<tr><td class=\"tbdata\">SoSe 2020</td><td class=\"tbdata\">\n   {exam_type}\n </td>\
                 <td class=\"tbdata\">100,0 %</td><td class=\"tbdata\"> {grade} </td></tr>"
            )
        })
        .collect();
    format!(
        "<html><body><h1>{heading}</h1>\
         <table id=\"result\">\
         <tr><td class=\"level02\" colspan=\"4\">Modulabschlussleistungen</td></tr>\
         {rows}\
         <tr><td class=\"tbdata\"></td><td class=\"tbdata\"> </td><td class=\"tbdata\"></td><td class=\"tbdata\"></td></tr>\
         </table>\
         <table><tr><td class=\"tbdata\">0</td><td class=\"tbdata\">Second table row</td></tr></table>\
         </body></html>"
    )
}
