//! Fixed tag vocabularies for diary entries.
//!
//! Each tag is persisted by its label so documents written by earlier
//! versions of the diary stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Every candidate, in the order a picker lists them.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_label(label: &str) -> Option<Self> {
                let label = label.trim();
                Self::ALL.iter().copied().find(|tag| tag.label() == label)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

tag_enum! {
    #[derive(Default)]
    pub enum Weather {
        #[default]
        Sunny => "晴れ",
        Cloudy => "曇り",
        Rain => "雨",
        Snow => "雪",
        Fog => "霧",
        Typhoon => "台風",
    }
}

tag_enum! {
    #[derive(Default)]
    pub enum Health {
        #[default]
        Energetic => "元気",
        Normal => "普通",
        SlightlyTired => "少し疲れた",
        Unwell => "体調不良",
        Excellent => "絶好調",
        Sleepy => "眠い",
    }
}

tag_enum! {
    #[derive(Default)]
    pub enum Mood {
        // Older documents store an unset mood as an empty string.
        #[default]
        #[serde(alias = "")]
        Unset => "選択しない",
        Happy => "幸せ",
        Fulfilled => "充実",
        Bored => "退屈",
        Anxious => "不安",
        Sad => "悲しい",
        Irritated => "イライラ",
        Motivated => "やる気満々",
        Relaxed => "リラックス",
        Accomplished => "達成感",
    }
}

tag_enum! {
    pub enum Activity {
        Exercise => "運動した",
        Reading => "読書した",
        Cooking => "料理した",
        MetFriends => "友達と会った",
        Family => "家族と過ごした",
        Studying => "勉強した",
        MoviesTv => "映画/TVを見た",
        Creative => "創作活動をした",
        Gaming => "ゲームをした",
        Resting => "休息した",
        Working => "仕事をした",
        LearnedSomethingNew => "新しいことを学んだ",
    }
}

impl Mood {
    pub fn is_set(self) -> bool {
        self != Mood::Unset
    }
}
