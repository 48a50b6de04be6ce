//
// Copyright (c) 2020-2021 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use clap::App;
use clap::Arg;
use clap::crate_authors;
use clap::crate_version;

pub fn cli<'a>() -> App<'a> {
    App::new("wavebenchd")
        .author(crate_authors!())
        .version(crate_version!())
        .about("Reflectarray RIS and radio-map simulation workbench")

        .arg(Arg::new("config")
            .required(false)
            .multiple(false)
            .takes_value(true)
            .long("config")
            .value_name("PATH")
            .about("Path to the server's config.toml (defaults to ./config.toml)")
        )

        .arg(Arg::new("hide_bars")
            .required(false)
            .multiple(false)
            .takes_value(false)
            .long("hide-bars")
            .about("Hide all progress bars")
        )

        .subcommand(App::new("serve")
            .about("Start the HTTP gateway and the job scheduler")
        )

        .subcommand(App::new("runs")
            .about("Inspect runs in the run store")

            .subcommand(App::new("list")
                .about("List all runs, most recent first")
            )

            .subcommand(App::new("show")
                .about("Show a single run's config, summary and progress")
                .arg(Arg::new("run_id")
                    .required(true)
                    .multiple(false)
                    .index(1)
                    .takes_value(true)
                    .value_name("RUN_ID")
                )
            )

            .subcommand(App::new("watch")
                .about("Poll a run's progress until it reaches a terminal state")
                .arg(Arg::new("run_id")
                    .required(true)
                    .multiple(false)
                    .index(1)
                    .takes_value(true)
                    .value_name("RUN_ID")
                )
            )
        )
}
