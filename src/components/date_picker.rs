//! Month-grid date picker.

use chrono::{Datelike, NaiveDate};
use leptos::prelude::*;

use crate::calendar::{self, WEEKDAY_HEADERS};

#[component]
pub fn DatePicker(
    /// The currently selected day
    #[prop(into)]
    selected: Signal<NaiveDate>,
    /// Invoked with the day the user clicked
    on_pick: Callback<NaiveDate>,
) -> impl IntoView {
    // Month on display; follows the selected day until the user pages away.
    let (shown_month, set_shown_month) = signal(calendar::first_of_month(selected.get_untracked()));
    Effect::new(move |_| {
        set_shown_month.set(calendar::first_of_month(selected.get()));
    });

    let page = move |delta: i32| {
        set_shown_month.update(|m| *m = calendar::shift_month(*m, delta));
    };

    view! {
        <div class="date-picker">
            <div class="date-picker-header">
                <button class="btn-small" on:click=move |_| page(-1)>"\u{2039}"</button>
                <span class="date-picker-month">{move || calendar::month_label(shown_month.get())}</span>
                <button class="btn-small" on:click=move |_| page(1)>"\u{203A}"</button>
            </div>
            <div class="date-picker-grid">
                {WEEKDAY_HEADERS
                    .iter()
                    .map(|w| view! { <span class="date-picker-weekday">{w.to_string()}</span> })
                    .collect::<Vec<_>>()}
                {move || {
                    let current = selected.get();
                    calendar::month_grid(shown_month.get())
                        .into_iter()
                        .map(|cell| match cell {
                            Some(day) => {
                                let class = if day == current {
                                    "date-picker-day selected"
                                } else {
                                    "date-picker-day"
                                };
                                view! {
                                    <button class=class on:click=move |_| on_pick.run(day)>
                                        {day.day()}
                                    </button>
                                }
                                .into_any()
                            }
                            None => view! { <span class="date-picker-blank"></span> }.into_any(),
                        })
                        .collect::<Vec<_>>()
                }}
            </div>
        </div>
    }
}
