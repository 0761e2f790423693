use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    None,
    Gold,
    Apple,
    Banana,
    Milk,
    Juice,
    Cookie,
    Candy,
    Cheese,
    Bread,
}

impl ItemType {
    /// Item types that take part in triplet matching.
    pub const REAL: [ItemType; 8] = [
        ItemType::Apple,
        ItemType::Banana,
        ItemType::Milk,
        ItemType::Juice,
        ItemType::Cookie,
        ItemType::Candy,
        ItemType::Cheese,
        ItemType::Bread,
    ];

    pub fn is_real(self) -> bool {
        !matches!(self, ItemType::None | ItemType::Gold)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorVariant {
    None,
    Red,
    Green,
    Blue,
    Yellow,
}

impl ColorVariant {
    pub const REAL: [ColorVariant; 4] = [
        ColorVariant::Red,
        ColorVariant::Green,
        ColorVariant::Blue,
        ColorVariant::Yellow,
    ];
}

/// Identity of a token for matching purposes.
pub type Kind = (ItemType, ColorVariant);

/// One item occupying a slot. Equality ignores `hidden`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq)]
pub struct Token {
    pub item: ItemType,
    pub color: ColorVariant,
    #[serde(default)]
    pub hidden: bool,
}

impl Token {
    pub const NONE: Token = Token {
        item: ItemType::None,
        color: ColorVariant::None,
        hidden: false,
    };

    pub const fn new(item: ItemType, color: ColorVariant) -> Self {
        Self {
            item,
            color,
            hidden: false,
        }
    }

    pub const fn gold() -> Self {
        Self::new(ItemType::Gold, ColorVariant::None)
    }

    pub fn from_kind(kind: Kind) -> Self {
        Self::new(kind.0, kind.1)
    }

    pub fn concealed(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn kind(&self) -> Kind {
        (self.item, self.color)
    }

    pub fn is_none(&self) -> bool {
        self.item == ItemType::None
    }

    pub fn is_gold(&self) -> bool {
        self.item == ItemType::Gold
    }

    /// Real collectibles only; `None` and `Gold` never form triplets.
    pub fn is_matchable(&self) -> bool {
        self.item.is_real() && self.color != ColorVariant::None
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::NONE
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item && self.color == other.color
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.hash(state);
        self.color.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            ItemType::None => write!(f, "-"),
            ItemType::Gold => write!(f, "Gold"),
            item => {
                write!(f, "{item:?}/{:?}", self.color)?;
                if self.hidden {
                    write!(f, "?")?;
                }
                Ok(())
            }
        }
    }
}
