/*!
# Clarity Co Analytics

A small-business analytics site: a public marketing page, an admin portal
for managing customers and their data assets, and a customer dashboard
("Insight Hub") with server-rendered charts.

## Overview

All state lives in two JSON documents, `customers.json` and
`dashboard-data.json`. They are kept in a named folder on a remote
document store when credentials are configured and reachable, with a
local JSON-file mirror that doubles as the fallback: if the remote store
cannot be reached the application keeps working against local files and
says so in a banner.

## Architecture

- **Storage** — a two-tier adapter over a `RemoteStore` trait (Google
  Drive v3 client in production, an in-memory store in tests) and a
  local JSON-file store. Loads prefer the remote copy and mirror it
  locally; saves go local-first, then remote.
- **Workspace** — the session-scoped owner of the two collections.
  Every mutation goes through it: validate, mutate, persist.
- **Web layer** (feature `web`) — axum handlers, handlebars templates
  embedded at compile time, cookie sessions with argon2-hashed
  credentials.
- **Dashboards** — metrics, trend lines and pie charts are derived
  server-side and rendered as inline SVG; a PNG report and CSV/XLSX
  exports are available as downloads.

## Modules

- **settings**: layered configuration (defaults, `config.toml`, env)
- **records**: customer and data-asset documents and their collections
- **drive**: the remote document store client and the `RemoteStore` seam
- **memory**: in-memory `RemoteStore` used by tests
- **local_store**: local JSON-file fallback store
- **storage**: the two-tier storage adapter
- **workspace**: session state and all mutations
- **auth**: password hashing, sessions, sign-in rules
- **dashboard**: derived metrics and the activity feed
- **charts**: SVG trend and pie chart rendering
- **export** / **report**: CSV, XLSX and PNG downloads (feature `web`)
- **views** / **app** / **admin** / **customer**: the web layer
  (feature `web`)
*/

pub mod auth;
pub mod charts;
pub mod dashboard;
pub mod drive;
pub mod local_store;
pub mod memory;
pub mod records;
pub mod settings;
pub mod storage;
pub mod workspace;

#[cfg(feature = "web")]
pub mod admin;
#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod customer;
#[cfg(feature = "web")]
pub mod export;
#[cfg(feature = "web")]
pub mod report;
#[cfg(feature = "web")]
pub mod views;
